//! Azulejo CLI
//!
//! Command-line interface for deriving JSON Schemas from the schema.org
//! vocabulary and checking payloads against them.

use std::path::PathBuf;
use std::process::ExitCode;

use azulejo::{
    collect_ancestor_fields, derive_schema, find_by_type, load_document, load_vocabulary,
    local_name, lookup_for, resolve_object_features, search, validate, CyclePolicy, DeriveOptions,
    Indices, Inheritance, ValidateError, Vocabulary, SCHEMA_ORG_URL,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "azulejo")]
#[command(about = "Derive JSON Schemas from the schema.org vocabulary")]
#[command(version)]
struct Cli {
    /// Vocabulary source: file path or URL (http:// or https://)
    #[arg(long, global = true, env = "AZULEJO_SOURCE", default_value = SCHEMA_ORG_URL)]
    source: String,

    /// Scan the graph instead of using the id/field indices
    #[arg(long, global = true)]
    no_index: bool,

    /// Log engine activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DeriveArgs {
    /// Levels of object-typed fields to expand
    #[arg(long, default_value_t = 0)]
    depth: usize,

    /// Attach range descriptions to properties
    #[arg(long)]
    descriptions: bool,

    /// Merge the own fields of this ancestor (repeatable, kept in order)
    #[arg(long = "include-ancestor", value_name = "ID")]
    include_ancestors: Vec<String>,

    /// Follow only the first listed parent when walking ancestors
    #[arg(long)]
    first_parent: bool,

    /// What to do when a class re-enters its own expansion: expand, truncate, or fail
    #[arg(long, default_value = "expand")]
    cycles: String,
}

impl DeriveArgs {
    fn options(&self) -> Result<DeriveOptions, u8> {
        let cycles = CyclePolicy::parse(&self.cycles).ok_or_else(|| {
            eprintln!(
                "Error: unknown cycle policy \"{}\": expected expand, truncate, or fail",
                self.cycles
            );
            2u8
        })?;

        let mut options = DeriveOptions::new()
            .recursion_levels(self.depth)
            .show_descriptions(self.descriptions)
            .inheritance(inheritance(self.first_parent))
            .cycles(cycles);
        for ancestor in &self.include_ancestors {
            let id = options.class_id(ancestor);
            options = options.select(id);
        }
        Ok(options)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the JSON Schema of a class
    Derive {
        /// Class name (e.g., Person) or prefixed id (e.g., schema:Person)
        class: String,

        #[command(flatten)]
        derive: DeriveArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show a class's record, own fields, and parents
    Features {
        /// Class name or prefixed id
        class: String,
    },

    /// List every ancestor of a class with its own fields
    Ancestors {
        /// Class name or prefixed id
        class: String,

        /// Follow only the first listed parent
        #[arg(long)]
        first_parent: bool,
    },

    /// Search records by type and free text
    Search {
        /// Text to look for in ids and comments
        #[arg(default_value = "")]
        query: String,

        /// Record type to search (local name, e.g., Class, Property, DataType)
        #[arg(long = "type", default_value = "Class")]
        record_type: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a payload against a class's derived schema
    Validate {
        /// Class name or prefixed id
        class: String,

        /// Payload file to validate
        payload: PathBuf,

        #[command(flatten)]
        derive: DeriveArgs,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let vocabulary = match load_vocabulary(&cli.source) {
        Ok(vocabulary) => vocabulary,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match run(cli.command, &vocabulary, !cli.no_index) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "azulejo=debug" } else { "azulejo=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AZULEJO_LOG").unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, vocabulary: &Vocabulary, indexed: bool) -> Result<(), u8> {
    let indices = indexed.then(|| vocabulary.indices());

    match command {
        Commands::Derive {
            class,
            derive,
            output,
            pretty,
        } => run_derive(vocabulary, indices, &class, &derive, output, pretty),
        Commands::Features { class } => run_features(vocabulary, indices, &class),
        Commands::Ancestors {
            class,
            first_parent,
        } => run_ancestors(vocabulary, indices, &class, first_parent),
        Commands::Search {
            query,
            record_type,
            json,
        } => run_search(vocabulary, &query, &record_type, json),
        Commands::Validate {
            class,
            payload,
            derive,
            json,
        } => run_validate(vocabulary, indices, &class, &payload, &derive, json),
    }
}

fn inheritance(first_parent: bool) -> Inheritance {
    if first_parent {
        Inheritance::FirstParent
    } else {
        Inheritance::AllParents
    }
}

fn run_derive(
    vocabulary: &Vocabulary,
    indices: Option<&Indices>,
    class: &str,
    args: &DeriveArgs,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let options = args.options()?;
    let schema = derive_schema(class, vocabulary.graph(), &options, indices)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&schema)
    } else {
        serde_json::to_string(&schema)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_features(
    vocabulary: &Vocabulary,
    indices: Option<&Indices>,
    class: &str,
) -> Result<(), u8> {
    let features =
        resolve_object_features(class, vocabulary.graph(), &DeriveOptions::new(), indices)
            .map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;

    let output = json!({
        "id": features.base_item.id,
        "fields": features.fields.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
        "subClassOf": features.sub_classes,
    });
    print_json(&output)
}

fn run_ancestors(
    vocabulary: &Vocabulary,
    indices: Option<&Indices>,
    class: &str,
    first_parent: bool,
) -> Result<(), u8> {
    let lookup = lookup_for(vocabulary.graph(), indices);
    let class_id = DeriveOptions::new().class_id(class);
    let ancestors =
        collect_ancestor_fields(lookup.as_ref(), &class_id, inheritance(first_parent)).map_err(
            |e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            },
        )?;

    let output: Map<String, Value> = ancestors
        .iter()
        .map(|(id, fields)| {
            let names: Vec<&str> = fields.iter().map(|f| local_name(&f.id)).collect();
            (id.to_string(), json!(names))
        })
        .collect();
    print_json(&Value::Object(output))
}

fn run_search(
    vocabulary: &Vocabulary,
    query: &str,
    record_type: &str,
    json_output: bool,
) -> Result<(), u8> {
    let candidates = find_by_type(record_type, vocabulary.graph());
    let found = search(&candidates, query);

    if json_output {
        let ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        print_json(&json!(ids))
    } else {
        for record in found {
            println!("{}", record.id);
        }
        Ok(())
    }
}

fn run_validate(
    vocabulary: &Vocabulary,
    indices: Option<&Indices>,
    class: &str,
    payload_path: &std::path::Path,
    args: &DeriveArgs,
    json_output: bool,
) -> Result<(), u8> {
    let payload = load_document(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let options = args.options()?;
    let schema = derive_schema(class, vocabulary.graph(), &options, indices)
        .map_err(|e| {
            report_error(json_output, &e.to_string());
            e.exit_code() as u8
        })?;

    match validate(&schema, &payload) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn print_json(value: &Value) -> Result<(), u8> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", text);
    Ok(())
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
