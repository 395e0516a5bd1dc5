use sicc_core::models::{Customer, Document};
use sicc_core::{ErrorMetadata, LogLevel, SiccError};
use sicc_services::{CustomerTree, DashboardSummary, GenerationResult, TreeIndex};
use std::fmt::Write;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for the CLI. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Log a failed command at the level its error calls for.
pub fn log_failure(err: &SiccError) {
    let code = err.error_code();
    let status = err.status_code();
    let details = err.detailed_message();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code, ?status, %details, "Command failed"),
        LogLevel::Warn => tracing::warn!(code, ?status, %details, "Command failed"),
        LogLevel::Error => tracing::error!(code, ?status, %details, "Command failed"),
    }
}

/// Banner text for a failed command, with a hint on what to do next.
pub fn failure_message(prefix: &str, err: &SiccError) -> String {
    let banner = err.banner_message(prefix);
    if err.requires_login() {
        format!("{} Iniciá sesión con `sicc login`.", banner)
    } else if err.is_recoverable() && !err.is_aborted() {
        format!("{} Podés reintentar la operación.", banner)
    } else {
        banner
    }
}

fn document_line(out: &mut String, indent: &str, document: &Document) {
    let status = document
        .status
        .map(|s| s.label())
        .unwrap_or("Sin estado");
    let due = document
        .proxima_fecha_presentacion
        .as_deref()
        .unwrap_or("-");
    let _ = writeln!(
        out,
        "{}- {} [{}] vence {}",
        indent,
        truncate_string(&document.display_name(), 40),
        status,
        due
    );
}

/// Indented outline of a customer tree: sites, requirements, providers and their
/// persons, vehicles and documents.
pub fn render_tree(tree: &CustomerTree, index: &TreeIndex) -> String {
    let mut out = String::new();
    let customer = tree
        .customer
        .as_ref()
        .map_or("Cliente no encontrado", |c| c.display_name());
    let _ = writeln!(out, "{}", customer);

    for site in &tree.sites {
        let _ = writeln!(out, "  Sitio: {}", site.display_name());
        for requirement in index.requirements_of(&site.id) {
            let _ = writeln!(out, "    Requerimiento: {}", requirement.display_name());
            for provider in index.providers_of(&requirement.id) {
                let _ = writeln!(out, "      Proveedor: {}", provider.display_name());
                for document in index.documents_of_provider(&provider.id) {
                    document_line(&mut out, "        ", document);
                }
                for person in index.persons_of(&provider.id) {
                    let _ = writeln!(
                        out,
                        "        Persona: {} (DNI {})",
                        person.full_name(),
                        person.dni_display()
                    );
                    for document in index.documents_of_person(&person.id) {
                        document_line(&mut out, "          ", document);
                    }
                }
                for vehicle in index.vehicles_of(&provider.id) {
                    let _ = writeln!(out, "        Vehículo: {}", vehicle.display_name());
                    for document in index.documents_of_vehicle(&vehicle.id) {
                        document_line(&mut out, "          ", document);
                    }
                }
            }
        }
    }

    for step in &tree.degraded {
        let _ = writeln!(out, "! {} no disponible: {}", step.step, step.error);
    }
    out
}

pub fn render_customers(customers: &[Customer], total: Option<u64>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:<40} {:<15} {}", "ID", "Nombre", "CUIT", "Estado");
    for customer in customers {
        let _ = writeln!(
            out,
            "{:<8} {:<40} {:<15} {}",
            customer.id.to_string(),
            truncate_string(customer.display_name(), 40),
            customer.cuit.as_deref().unwrap_or("-"),
            customer.status.as_deref().unwrap_or("-")
        );
    }
    match total {
        Some(total) => {
            let _ = writeln!(out, "\n{} de {} clientes", customers.len(), total);
        }
        None => {
            let _ = writeln!(out, "\n{} clientes", customers.len());
        }
    }
    out
}

pub fn render_generation(result: &GenerationResult) -> String {
    let mut out = String::new();
    let rows = [
        (
            "Proveedores",
            result.created_provider_docs,
            result.providers_processed,
            result.skipped_providers,
        ),
        (
            "Personas",
            result.created_person_docs,
            result.persons_processed,
            result.skipped_persons,
        ),
        (
            "Vehículos",
            result.created_vehicle_docs,
            result.vehicles_processed,
            result.skipped_vehicles,
        ),
    ];
    for (label, created, processed, skipped) in rows {
        let _ = writeln!(
            out,
            "{:<12} {} documentos creados ({} procesados, {} omitidos)",
            label, created, processed, skipped
        );
    }
    let _ = writeln!(out, "Parámetros vigentes: {}\n", result.parameters_count);
    out
}

pub fn render_summary(summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let counts = &summary.counts;
    let _ = writeln!(out, "Clientes:       {}", counts.customers);
    let _ = writeln!(out, "Sitios:         {}", counts.sites);
    let _ = writeln!(out, "Requerimientos: {}", counts.requirements);
    let _ = writeln!(out, "Proveedores:    {}", counts.providers);
    let _ = writeln!(out, "\nDocumentos por estado:");
    for slice in &summary.document_status {
        let _ = writeln!(out, "  {:<16} {}", slice.label, slice.value);
    }
    if !summary.upcoming_documents.is_empty() {
        let _ = writeln!(out, "\nPróximos vencimientos:");
        for document in &summary.upcoming_documents {
            document_line(&mut out, "  ", document);
        }
    }
    out
}
