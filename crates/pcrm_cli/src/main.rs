//! Command-line front end for the contact store and dashboard.
//!
//! # Responsibility
//! - Map subcommands onto `ContactService` use-cases.
//! - Resolve "today" from the local clock; the core never reads a clock.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use pcrm_core::{
    open_db, ContactId, ContactService, EngineConfig, Gift, GiftDirection, InteractionKind,
    NotificationSink,
    OccasionId, PartialDate, ReminderNotice, RelationshipKind, SinkError,
    SqliteContactRepository,
};
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;
type Service<'conn> = ContactService<SqliteContactRepository<'conn>>;

#[derive(Parser)]
#[command(name = "pcrm")]
#[command(about = "Local-first personal relationship manager", long_about = None)]
#[command(version = pcrm_core::core_version())]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "pcrm.db")]
    db: PathBuf,

    /// Engine config (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true, default_value = pcrm_core::default_log_level())]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a contact
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        /// MM-DD or YYYY-MM-DD
        #[arg(long)]
        birthday: Option<PartialDate>,
        #[arg(long)]
        how_met: Option<String>,
        #[arg(long)]
        importance: Option<f64>,
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        #[arg(long = "note", short = 'n')]
        notes: Vec<String>,
    },
    /// Find contacts by name
    Find { query: String },
    /// List contacts carrying a tag
    Tagged { tag: String },
    /// Delete a contact and everything attached to it
    Delete { contact: String },
    /// Log an interaction
    Log {
        contact: String,
        #[arg(long, default_value = "other", value_parser = parse_interaction_kind)]
        kind: InteractionKind,
        #[arg(long, default_value = "")]
        note: String,
        /// Defaults to now
        #[arg(long)]
        at: Option<NaiveDateTime>,
    },
    /// Add a one-shot reminder
    Remind {
        contact: String,
        due: NaiveDate,
        message: String,
    },
    /// Mark an occasion handled
    Ack {
        occasion: OccasionId,
        #[arg(long)]
        on: Option<NaiveDate>,
    },
    /// Record a gift given to or received from a contact
    Gift {
        contact: String,
        description: String,
        #[arg(long, default_value = "given", value_parser = parse_gift_direction)]
        direction: GiftDirection,
        #[arg(long)]
        on: Option<NaiveDate>,
        /// Occasion id the gift was for
        #[arg(long)]
        occasion: Option<OccasionId>,
    },
    /// List gifts exchanged with a contact
    Gifts { contact: String },
    /// Link two contacts
    Relate {
        a: String,
        b: String,
        #[arg(long, default_value = "friend", value_parser = parse_relationship_kind)]
        kind: RelationshipKind,
        #[arg(long, default_value_t = 0.5)]
        strength: f64,
    },
    /// Remove the link between two contacts
    Unrelate { a: String, b: String },
    /// Show the suggestion feed
    Dashboard {
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Print the relationship graph as JSON
    Graph,
    /// Print due reminders as notifications
    Notify {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn sink_id(&self) -> &str {
        "stdout"
    }

    fn push_reminder(&self, notice: &ReminderNotice) -> Result<(), SinkError> {
        println!(
            "[{}] {}: {}",
            notice.category.as_str(),
            notice.contact_name,
            notice.message
        );
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        pcrm_core::init_logging(&cli.log_level, log_dir)?;
    }
    let config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };
    let conn = open_db(&cli.db)?;
    let service = ContactService::new(SqliteContactRepository::try_new(&conn)?, config)?;
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Add {
            name,
            email,
            birthday,
            how_met,
            importance,
            tags,
            notes,
        } => {
            let mut contact = pcrm_core::Contact::new(name, today);
            contact.email = email;
            contact.birthday = birthday;
            contact.how_met = how_met;
            contact.tags = tags;
            contact.notes = notes;
            if let Some(importance) = importance {
                contact.importance = importance;
            }
            println!("{}", service.add_contact(&contact)?);
        }
        Commands::Find { query } => {
            for contact in service.find_contacts_by_name(&query)? {
                println!("{}  {}", contact.id, contact.display_name);
            }
        }
        Commands::Tagged { tag } => {
            for contact in service.list_contacts_by_tag(&tag)? {
                println!("{}  {}", contact.id, contact.display_name);
            }
        }
        Commands::Delete { contact } => {
            let id = resolve_contact(&service, &contact)?;
            service.delete_contact(id)?;
        }
        Commands::Log {
            contact,
            kind,
            note,
            at,
        } => {
            let id = resolve_contact(&service, &contact)?;
            let at = at.unwrap_or_else(|| Local::now().naive_local());
            println!("{}", service.log_interaction(id, at, kind, note)?);
        }
        Commands::Remind {
            contact,
            due,
            message,
        } => {
            let id = resolve_contact(&service, &contact)?;
            println!("{}", service.add_reminder(id, message, due)?);
        }
        Commands::Ack { occasion, on } => {
            service.acknowledge_occasion(occasion, on.unwrap_or(today))?;
        }
        Commands::Gift {
            contact,
            description,
            direction,
            on,
            occasion,
        } => {
            let id = resolve_contact(&service, &contact)?;
            let mut gift = Gift::new(id, description, direction);
            gift.exchanged_on = on;
            gift.occasion_id = occasion;
            println!("{}", service.add_gift(&gift)?);
        }
        Commands::Gifts { contact } => {
            let id = resolve_contact(&service, &contact)?;
            for gift in service.list_gifts(id)? {
                let on = gift
                    .exchanged_on
                    .map_or_else(|| "-".to_string(), |date| date.to_string());
                println!("{on:<10}  {:<8}  {}", gift.direction.as_str(), gift.description);
            }
        }
        Commands::Relate {
            a,
            b,
            kind,
            strength,
        } => {
            let a = resolve_contact(&service, &a)?;
            let b = resolve_contact(&service, &b)?;
            service.relate(a, b, kind, strength)?;
        }
        Commands::Unrelate { a, b } => {
            let a = resolve_contact(&service, &a)?;
            let b = resolve_contact(&service, &b)?;
            if !service.unrelate(a, b)? {
                eprintln!("no relationship between {a} and {b}");
            }
        }
        Commands::Dashboard { as_of, json } => {
            print_dashboard(&service, as_of.unwrap_or(today), json)?;
        }
        Commands::Graph => {
            println!("{}", service.export_graph()?.to_json()?);
        }
        Commands::Notify { as_of } => {
            let report = pcrm_core::push_due_reminders(
                service.store(),
                &StdoutSink,
                as_of.unwrap_or(today),
                service.config(),
            )?;
            log::info!(
                "event=cli_notify module=cli status=ok delivered={}",
                report.delivered
            );
        }
    }
    Ok(())
}

fn print_dashboard(service: &Service<'_>, as_of: NaiveDate, json: bool) -> CliResult<()> {
    let render = service.render_dashboard(as_of)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&render)?);
        return Ok(());
    }

    let names: HashMap<ContactId, String> = service
        .list_contacts()?
        .into_iter()
        .map(|contact| (contact.id, contact.display_name))
        .collect();
    for item in &render.items {
        let name = names.get(&item.contact_id).map_or("?", String::as_str);
        println!(
            "{:<18} {:>5.2}  {:<24} {}",
            item.category.as_str(),
            item.score,
            name,
            item.rationale
        );
    }
    for diagnostic in &render.diagnostics {
        eprintln!("warning: {}", diagnostic.message);
    }
    Ok(())
}

/// Accepts a contact id, or a name matching exactly one contact.
fn resolve_contact(service: &Service<'_>, reference: &str) -> CliResult<ContactId> {
    if let Ok(id) = reference.parse::<ContactId>() {
        return Ok(id);
    }
    let mut matches = service.find_contacts_by_name(reference)?;
    match matches.len() {
        1 => Ok(matches.remove(0).id),
        0 => Err(format!("no contact named `{reference}`").into()),
        count => Err(format!("`{reference}` matches {count} contacts; use the id").into()),
    }
}

fn parse_interaction_kind(value: &str) -> Result<InteractionKind, String> {
    InteractionKind::parse(&value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown interaction kind `{value}`"))
}

fn parse_gift_direction(value: &str) -> Result<GiftDirection, String> {
    GiftDirection::parse(&value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown gift direction `{value}`"))
}

fn parse_relationship_kind(value: &str) -> Result<RelationshipKind, String> {
    RelationshipKind::parse(&value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown relationship kind `{value}`"))
}
