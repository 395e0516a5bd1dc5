//! SICC CLI: command-line client for the SICC Directus backend.
//!
//! Reads SICC_DIRECTUS_URL and either SICC_DIRECTUS_TOKEN or a session saved by `sicc login`.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sicc_api_client::DirectusClient;
use sicc_cli::{
    failure_message, init_tracing, log_failure, render_customers, render_generation,
    render_summary, render_tree,
};
use sicc_core::models::{
    LoginRequest, NewCustomer, NewPerson, NewProvider, NewRequirement, NewSite, NewVehicle,
    RecordStatus,
};
use sicc_core::{ItemId, SiccConfig, SiccError};
use sicc_services::{
    CatalogService, CustomerTreeLoader, DashboardService, GenerationInput,
    RequiredDocumentsGenerator, TreeIndex,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "sicc", about = "SICC dashboard CLI")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password and store the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Entity counts, document status breakdown and upcoming documents
    Dashboard,
    /// List customers
    Customers {
        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "20")]
        page_size: u32,
        /// Case-insensitive name search
        #[arg(long)]
        search: Option<String>,
        /// Every customer in a single list
        #[arg(long)]
        all: bool,
    },
    /// Show the site/requirement/provider tree of a customer
    Tree {
        customer_id: ItemId,
    },
    /// Create the missing required documents for a customer's providers, then show the
    /// reloaded tree
    Generate {
        customer_id: ItemId,
        /// Only generate for these providers
        #[arg(long = "provider")]
        providers: Vec<ItemId>,
    },
    /// Upload a PDF and attach it to a provider document
    AttachFile {
        document_id: ItemId,
        file: PathBuf,
    },
    /// Archive a provider document and detach its file
    ArchiveDocument {
        document_id: ItemId,
    },
    /// Create catalog entries
    Create {
        #[command(subcommand)]
        sub: CreateCommands,
    },
}

#[derive(Subcommand)]
enum CreateCommands {
    Customer {
        name: String,
        #[arg(long)]
        cuit: Option<String>,
        #[arg(long, default_value = "published")]
        status: RecordStatus,
    },
    Site {
        customer_id: ItemId,
        nombre: String,
        #[arg(long, default_value = "published")]
        status: RecordStatus,
    },
    Requirement {
        site_id: ItemId,
        nombre: String,
        /// YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "published")]
        status: RecordStatus,
    },
    Provider {
        requirement_id: ItemId,
        nombre: String,
        #[arg(long)]
        cuit: Option<String>,
        #[arg(long, default_value = "published")]
        status: RecordStatus,
    },
    Person {
        provider_id: ItemId,
        nombre: String,
        apellido: String,
        #[arg(long)]
        dni: String,
        #[arg(long, default_value = "published")]
        status: RecordStatus,
    },
    Vehicle {
        provider_id: ItemId,
        #[arg(long)]
        dominio: Option<String>,
        #[arg(long)]
        marca: Option<String>,
        #[arg(long)]
        modelo: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        observaciones: Option<String>,
        #[arg(long, default_value = "published")]
        status: RecordStatus,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Print a service error the way the dashboard banner shows it.
fn report(prefix: &str, err: SiccError) -> anyhow::Error {
    log_failure(&err);
    anyhow::anyhow!(failure_message(prefix, &err))
}

async fn create(catalog: &CatalogService, sub: CreateCommands) -> anyhow::Result<serde_json::Value> {
    let created = match sub {
        CreateCommands::Customer { name, cuit, status } => serde_json::to_value(
            catalog
                .create_customer(NewCustomer { status, name, cuit })
                .await
                .map_err(|e| report("No se pudo crear el cliente.", e))?,
        ),
        CreateCommands::Site {
            customer_id,
            nombre,
            status,
        } => serde_json::to_value(
            catalog
                .create_site(NewSite {
                    status,
                    nombre,
                    url_slug: None,
                    id_cliente: customer_id,
                })
                .await
                .map_err(|e| report("No se pudo crear el sitio.", e))?,
        ),
        CreateCommands::Requirement {
            site_id,
            nombre,
            start,
            end,
            status,
        } => serde_json::to_value(
            catalog
                .create_requirement(NewRequirement {
                    status,
                    nombre,
                    fecha_inicio: start,
                    fecha_proyectada_fin: end,
                    id_sites: site_id,
                })
                .await
                .map_err(|e| report("No se pudo crear el requerimiento.", e))?,
        ),
        CreateCommands::Provider {
            requirement_id,
            nombre,
            cuit,
            status,
        } => serde_json::to_value(
            catalog
                .create_provider(NewProvider {
                    status,
                    nombre,
                    cuit,
                    id_requerimientos: requirement_id,
                    url_slug: None,
                })
                .await
                .map_err(|e| report("No se pudo crear el proveedor.", e))?,
        ),
        CreateCommands::Person {
            provider_id,
            nombre,
            apellido,
            dni,
            status,
        } => serde_json::to_value(
            catalog
                .create_person(NewPerson {
                    status,
                    nombre,
                    apellido,
                    dni,
                    id_proveedor: provider_id,
                })
                .await
                .map_err(|e| report("No se pudo crear la persona.", e))?,
        ),
        CreateCommands::Vehicle {
            provider_id,
            dominio,
            marca,
            modelo,
            color,
            observaciones,
            status,
        } => serde_json::to_value(
            catalog
                .create_vehicle(NewVehicle {
                    status,
                    dominio,
                    marca,
                    modelo,
                    color,
                    observaciones,
                    id_proveedor: provider_id,
                })
                .await
                .map_err(|e| report("No se pudo crear el vehículo.", e))?,
        ),
    };
    created.context("Serialize created row")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SiccConfig::from_env()
        .context("Failed to load configuration. Set SICC_DIRECTUS_URL (and optionally SICC_DIRECTUS_TOKEN)")?;
    let client = Arc::new(
        DirectusClient::from_config(&config).context("Failed to create Directus client")?,
    );

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let catalog = CatalogService::new(client.clone());

    match cli.command {
        Commands::Login { email, password } => {
            let session = client
                .login(&LoginRequest { email, password })
                .await
                .map_err(|e| report("No se pudo iniciar sesión.", e))?;
            print_json(&serde_json::json!({
                "logged_in": true,
                "expires_at": session.expires_at,
            }))?;
        }
        Commands::Logout => {
            let had_session = client.has_session();
            client
                .logout()
                .map_err(|e| report("No se pudo cerrar la sesión.", e))?;
            print_json(&serde_json::json!({ "logged_in": false, "had_session": had_session }))?;
        }
        Commands::Dashboard => {
            let summary = DashboardService::new(client.clone())
                .summary(&cancel)
                .await
                .map_err(|e| report("No se pudieron cargar los datos del dashboard.", e))?;
            match cli.format {
                Format::Json => print_json(&summary)?,
                Format::Table => print!("{}", render_summary(&summary)),
            }
        }
        Commands::Customers {
            page,
            page_size,
            search,
            all,
        } => {
            if all {
                let customers = catalog
                    .manager_customers(&cancel)
                    .await
                    .map_err(|e| report("No se pudieron cargar los clientes.", e))?;
                match cli.format {
                    Format::Json => print_json(&customers)?,
                    Format::Table => print!("{}", render_customers(&customers, None)),
                }
            } else {
                let page = catalog
                    .customers_page(page, page_size, search.as_deref(), &cancel)
                    .await
                    .map_err(|e| report("No se pudieron cargar los clientes.", e))?;
                match cli.format {
                    Format::Json => print_json(&page)?,
                    Format::Table => {
                        print!("{}", render_customers(&page.customers, Some(page.total)))
                    }
                }
            }
        }
        Commands::Tree { customer_id } => {
            let tree = CustomerTreeLoader::new(client.clone())
                .load(&customer_id, &cancel)
                .await
                .map_err(|e| report("No se pudo cargar el cliente.", e))?;
            match cli.format {
                Format::Json => print_json(&tree)?,
                Format::Table => print!("{}", render_tree(&tree, &TreeIndex::build(&tree))),
            }
        }
        Commands::Generate {
            customer_id,
            providers,
        } => {
            let loader = CustomerTreeLoader::new(client.clone());
            let tree = loader
                .load(&customer_id, &cancel)
                .await
                .map_err(|e| report("No se pudo cargar el cliente.", e))?;
            let index = TreeIndex::build(&tree);
            let selected: Vec<_> = tree
                .providers
                .iter()
                .filter(|p| providers.is_empty() || providers.contains(&p.id))
                .cloned()
                .collect();
            let input = GenerationInput::from_tree(&tree, &index)
                .map_err(|e| report("Error al generar documentos requeridos.", e))?
                .with_providers(&selected);

            let result = RequiredDocumentsGenerator::new(client.clone())
                .generate(input, &cancel)
                .await
                .map_err(|e| report("Error al generar documentos requeridos.", e))?;

            let refreshed = loader
                .load(&customer_id, &cancel)
                .await
                .map_err(|e| report("No se pudo recargar el cliente.", e))?;
            match cli.format {
                Format::Json => print_json(&serde_json::json!({
                    "result": result,
                    "tree": refreshed,
                }))?,
                Format::Table => {
                    print!("{}", render_generation(&result));
                    print!("{}", render_tree(&refreshed, &TreeIndex::build(&refreshed)));
                }
            }
        }
        Commands::AttachFile { document_id, file } => {
            let file_id = client
                .upload_file(&file)
                .await
                .map_err(|e| report("No se pudo subir el archivo.", e))?;
            let document = catalog
                .attach_document_file(&document_id, &file_id)
                .await
                .map_err(|e| report("No se pudo asociar el archivo.", e))?;
            print_json(&serde_json::json!({
                "document": document,
                "file_url": client.asset_url(&file_id.to_string()),
            }))?;
        }
        Commands::ArchiveDocument { document_id } => {
            let document = catalog
                .archive_document(&document_id)
                .await
                .map_err(|e| report("No se pudo archivar el documento.", e))?;
            print_json(&document)?;
        }
        Commands::Create { sub } => {
            let created = create(&catalog, sub).await?;
            print_json(&created)?;
        }
    }

    Ok(())
}
