//! Builder for the Directus item query string.
//!
//! Parameter names are emitted verbatim (`filter[field][_in]`, `sort[]`, `groupBy[]`, ...);
//! the HTTP layer percent-encodes them.

use crate::relation::ItemId;

/// Filter operators used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    In,
    IContains,
    Lte,
    Gte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "_eq",
            FilterOp::In => "_in",
            FilterOp::IContains => "_icontains",
            FilterOp::Lte => "_lte",
            FilterOp::Gte => "_gte",
        }
    }
}

/// One `filter[...]` condition. `path` has one segment for a plain field and two for the
/// nested-relation form (`filter[idSites][id][_in]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub path: Vec<String>,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn param_name(&self) -> String {
        let path: String = self.path.iter().map(|p| format!("[{}]", p)).collect();
        format!("filter{}[{}]", path, self.op.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub fields: Vec<String>,
    pub filters: Vec<Filter>,
    pub sort: Vec<String>,
    /// `-1` requests every row
    pub limit: Option<i64>,
    pub page: Option<u32>,
    pub filter_count: bool,
    pub group_by: Vec<String>,
    pub aggregate_count: bool,
    pub cache_bust: Option<String>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            path: vec![field.to_string()],
            op,
            value: value.into(),
        });
        self
    }

    pub fn filter_eq(self, field: &str, value: impl ToString) -> Self {
        self.filter(field, FilterOp::Eq, value.to_string())
    }

    /// Membership filter on a scalar foreign key: `filter[field][_in]=1,2,3`.
    pub fn filter_in(self, field: &str, ids: &[ItemId]) -> Self {
        self.filter(field, FilterOp::In, join_ids(ids))
    }

    /// Membership filter on an embedded relation: `filter[field][id][_in]=1,2,3`.
    pub fn filter_nested_in(mut self, field: &str, ids: &[ItemId]) -> Self {
        self.filters.push(Filter {
            path: vec![field.to_string(), "id".to_string()],
            op: FilterOp::In,
            value: join_ids(ids),
        });
        self
    }

    pub fn sort(mut self, field: &str) -> Self {
        self.sort.push(field.to_string());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Ask for `meta.filter_count` in the response.
    pub fn with_filter_count(mut self) -> Self {
        self.filter_count = true;
        self
    }

    /// `groupBy[]={field}&aggregate[count]=*`
    pub fn group_count(mut self, field: &str) -> Self {
        self.group_by.push(field.to_string());
        self.aggregate_count = true;
        self
    }

    pub fn cache_bust(mut self, token: Option<&str>) -> Self {
        self.cache_bust = token.map(str::to_string);
        self
    }

    /// Query-string pairs in the order the dashboard always sent them.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if self.filter_count {
            pairs.push(("meta".to_string(), "filter_count".to_string()));
        }
        for field in &self.sort {
            pairs.push(("sort[]".to_string(), field.clone()));
        }
        if !self.fields.is_empty() {
            pairs.push(("fields".to_string(), self.fields.join(",")));
        }
        for field in &self.group_by {
            pairs.push(("groupBy[]".to_string(), field.clone()));
        }
        if self.aggregate_count {
            pairs.push(("aggregate[count]".to_string(), "*".to_string()));
        }
        for filter in &self.filters {
            pairs.push((filter.param_name(), filter.value.clone()));
        }
        if let Some(token) = &self.cache_bust {
            pairs.push(("cacheBust".to_string(), token.clone()));
        }
        pairs
    }
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ItemId::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
