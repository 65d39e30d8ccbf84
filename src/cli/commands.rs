use clap::Subcommand;

use crate::types::SubscriptionType;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (database, signing secret, admin user, defaults)
    Init {
        /// Data directory for the database and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Password for the admin user (prompted for when omitted)
        #[arg(long)]
        admin_password: Option<String>,

        /// Skip interactive prompts; a password is generated if none is given
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Grant a subscription, replacing any active one
    Grant {
        /// Data directory for the database and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Username to grant the subscription to
        #[arg(long)]
        username: String,

        /// Plan: 7days, 30days, 60days or 365days
        #[arg(long = "type")]
        subscription_type: SubscriptionType,

        /// Duration in days (defaults to the plan length)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Show server status information
    Info {
        /// Data directory for the database and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user
    Add {
        /// Data directory for the database and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Username for the new user (at most 6 characters)
        #[arg(long)]
        username: Option<String>,

        /// Password for the new user
        #[arg(long)]
        password: Option<String>,

        /// Create the user with the admin role
        #[arg(long)]
        admin: bool,

        /// Skip interactive prompts (requires --username and --password)
        #[arg(long)]
        non_interactive: bool,
    },
}
