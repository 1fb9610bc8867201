//! Command-line surface for `lightfield-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use lightfield::domain::bookings::BookingStatus;
use lightfield::domain::resources::ResourceKind;
use lightfield::domain::types::ContactStatus;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "lightfield-cli", version, about = "LightField back-office API CLI", long_about = None)]
pub struct Cli {
    /// API base URL, e.g. <https://api.example.com>
    #[arg(long, env = "LIGHTFIELD_SITE_URL")]
    pub site: Option<String>,

    /// File holding the signed-in session between invocations
    #[arg(long, env = "LIGHTFIELD_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with a staff account
    Login(LoginArgs),
    /// Revoke the stored session
    Logout,
    /// Associates (team members)
    Associates(ResourceArgs),
    /// Blog categories
    Categories(ResourceArgs),
    /// Blog posts
    Blogs(ResourceArgs),
    /// Client testimonials
    Testimonials(ResourceArgs),
    /// Grants, scholarships and awards
    Grants(ResourceArgs),
    /// Consultation services
    Services(ResourceArgs),
    /// Consultation bookings
    Bookings(BookingsArgs),
    /// Contact form submissions
    Contacts(ContactsArgs),
    /// Dashboard figures
    Dashboard(DashboardArgs),
}

impl Commands {
    /// Ordered collection targeted by a resource command.
    pub fn resource(&self) -> Option<ResourceKind> {
        match self {
            Commands::Associates(_) => Some(ResourceKind::Associates),
            Commands::Categories(_) => Some(ResourceKind::Categories),
            Commands::Blogs(_) => Some(ResourceKind::Blogs),
            Commands::Testimonials(_) => Some(ResourceKind::Testimonials),
            Commands::Grants(_) => Some(ResourceKind::Grants),
            Commands::Services(_) => Some(ResourceKind::ConsultationServices),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub username: String,

    /// Password (CLI flag intentionally absent to avoid shell history leaks)
    #[arg(hide = true, env = "LIGHTFIELD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Read the password from this file instead of the environment
    #[arg(long)]
    pub password_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ResourceArgs {
    #[command(subcommand)]
    pub action: ResourceCmd,
}

#[derive(Subcommand, Debug)]
pub enum ResourceCmd {
    /// List the collection in display order
    List {
        #[arg(long)]
        search: Option<String>,
        /// Extra server filter as key=value (repeatable)
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
    },
    /// Show one item by id or slug
    Get { key: String },
    /// Create an item from a JSON document
    Create(JsonInput),
    /// Patch an item with a JSON document
    Update {
        key: String,
        #[command(flatten)]
        input: JsonInput,
    },
    /// Delete an item
    Delete { key: String },
    /// Submit a complete ordering; the first id gets priority 0
    Reorder {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<Uuid>,
        /// Reject the write when the collection moved past this version
        #[arg(long)]
        base_version: Option<u64>,
    },
    /// Move one item onto the position of another, as a drag and drop would
    Move {
        item: Uuid,
        #[arg(long)]
        over: Uuid,
    },
}

#[derive(Args, Debug, Default)]
pub struct JsonInput {
    /// Inline JSON document
    #[arg(long)]
    pub json: Option<String>,
    /// Path to a JSON document (takes precedence over --json)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BookingsArgs {
    #[command(subcommand)]
    pub action: BookingsCmd,
}

#[derive(Subcommand, Debug)]
pub enum BookingsCmd {
    /// List bookings (staff)
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<BookingStatus>,
        /// YYYY-MM-DD
        #[arg(long)]
        date_from: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date_to: Option<String>,
        #[arg(long)]
        service_id: Option<Uuid>,
    },
    /// Show one booking (staff)
    Get { id: Uuid },
    /// Change status, notes or assignment (staff)
    Update {
        id: Uuid,
        #[arg(long)]
        status: Option<BookingStatus>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, conflicts_with = "unassign")]
        assign: Option<Uuid>,
        #[arg(long, default_value_t = false)]
        unassign: bool,
    },
    /// Booking statistics (staff)
    Stats,
    /// Create a booking from a JSON request and print the checkout details
    Create(JsonInput),
    /// Confirm payment for a reference
    Verify { reference: String },
    /// Public status lookup by reference
    Lookup { reference: String },
}

#[derive(Args, Debug)]
pub struct ContactsArgs {
    #[command(subcommand)]
    pub action: ContactsCmd,
}

#[derive(Subcommand, Debug)]
pub enum ContactsCmd {
    List {
        #[arg(long)]
        status: Option<ContactStatusArg>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a submission; unread ones become read
    Get { id: Uuid },
    /// Set the handling status
    Status {
        id: Uuid,
        #[arg(long)]
        status: ContactStatusArg,
    },
    Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct DashboardArgs {
    #[command(subcommand)]
    pub action: DashboardCmd,
}

#[derive(Subcommand, Debug)]
pub enum DashboardCmd {
    /// Headline counts and revenue
    Stats,
    /// Latest audit entries
    Activity,
    /// Views of recently published posts, per day
    Views {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Recently published posts, per day
    Posts {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Published posts per category
    Categories,
    /// Contact submissions per status
    Contacts,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ContactStatusArg {
    Unread,
    Read,
    Responded,
}

impl From<ContactStatusArg> for ContactStatus {
    fn from(value: ContactStatusArg) -> Self {
        match value {
            ContactStatusArg::Unread => ContactStatus::Unread,
            ContactStatusArg::Read => ContactStatus::Read,
            ContactStatusArg::Responded => ContactStatus::Responded,
        }
    }
}

impl fmt::Display for ContactStatusArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ContactStatus::from(*self).as_str())
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty filter key in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
