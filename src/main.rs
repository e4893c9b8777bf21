use anyhow::Context;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tokio::sync::mpsc::UnboundedReceiver;

use kzguard_console::filter::{filter, Bucketed, StatusBuckets};
use kzguard_console::handlers::admin::AdminView;
use kzguard_console::handlers::ban::{public_bans, BanView};
use kzguard_console::handlers::log::LogView;
use kzguard_console::handlers::server::CommunityView;
use kzguard_console::handlers::verification::VerificationView;
use kzguard_console::handlers::whitelist::{
    application_status, apply, player_info, ApplyOutcome, WhitelistView,
};
use kzguard_console::handlers::{auth, ActionOutcome};
use kzguard_console::logging::init_logging;
use kzguard_console::models::ban::{Ban, BanType, CreateBanRequest};
use kzguard_console::models::server::{CreateServerRequest, UpdateServerRequest};
use kzguard_console::models::user::{CreateAdminRequest, Role, UpdateAdminRequest};
use kzguard_console::models::verification::VerificationStatus;
use kzguard_console::notify::{drain, Level, Notification};
use kzguard_console::utils::{format_minutes, format_time, parse_duration_minutes};
use kzguard_console::{ApiClient, Config, Notifier};

#[derive(Debug, Parser)]
#[command(name = "kzguard", version, about = "KZGuard admin console")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Search box and status tab of a list view.
#[derive(Debug, clap::Args)]
struct ViewArgs {
    /// Case-insensitive substring filter
    #[arg(long, short, default_value = "")]
    search: String,

    /// Only show one status tab
    #[arg(long)]
    status: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Login {
        username: String,

        #[arg(long, env = "KZGUARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    Logout,

    /// Show the stored session
    Whoami,

    ChangePassword {
        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },

    #[command(subcommand)]
    Bans(BanCommand),

    #[command(subcommand)]
    Admins(AdminCommand),

    #[command(subcommand)]
    Groups(GroupCommand),

    #[command(subcommand)]
    Servers(ServerCommand),

    #[command(subcommand)]
    Whitelist(WhitelistCommand),

    #[command(subcommand)]
    Verifications(VerificationCommand),

    /// Audit log
    Logs {
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Debug, Subcommand)]
enum BanCommand {
    List {
        #[command(flatten)]
        view: ViewArgs,
    },

    /// The list shown on the public ban page
    Public,

    Create {
        steam_id: String,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        ip: String,

        /// account or ip
        #[arg(long, default_value = "account")]
        ban_type: BanType,

        #[arg(long)]
        reason: Option<String>,

        /// e.g. 30m, 2h, 7d, 0 for permanent
        #[arg(long, default_value = "0")]
        duration: String,
    },

    /// Flip an active ban to expired
    Lift { id: i64 },

    /// Flip an expired ban back to active
    Reban { id: i64 },

    Delete {
        id: i64,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    List {
        #[command(flatten)]
        view: ViewArgs,
    },

    Create {
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long, default_value = "admin")]
        role: Role,

        #[arg(long)]
        steam_id: Option<String>,

        #[arg(long)]
        remark: Option<String>,
    },

    Update {
        id: i64,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        password: Option<String>,

        #[arg(long)]
        role: Option<Role>,

        #[arg(long)]
        steam_id: Option<String>,

        #[arg(long)]
        remark: Option<String>,
    },

    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum GroupCommand {
    List {
        #[command(flatten)]
        view: ViewArgs,
    },

    Create { name: String },

    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ServerCommand {
    Create {
        group_id: i64,

        #[arg(long)]
        name: String,

        #[arg(long)]
        ip: String,

        #[arg(long, default_value_t = 27015)]
        port: i32,

        #[arg(long, env = "KZGUARD_RCON_PASSWORD", hide_env_values = true)]
        rcon_password: String,

        #[arg(long)]
        verification: bool,

        #[arg(long)]
        min_rating: Option<f64>,

        #[arg(long)]
        min_level: Option<i32>,

        #[arg(long)]
        whitelist_only: bool,
    },

    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        ip: Option<String>,

        #[arg(long)]
        port: Option<i32>,

        /// Leave out to keep the current password
        #[arg(long)]
        rcon_password: Option<String>,

        #[arg(long)]
        verification: Option<bool>,

        #[arg(long)]
        min_rating: Option<f64>,

        #[arg(long)]
        min_level: Option<i32>,

        #[arg(long)]
        whitelist_only: Option<bool>,
    },

    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },

    /// Live player list
    Players { id: i64 },

    Kick {
        server_id: i64,
        userid: i32,

        #[arg(long)]
        yes: bool,
    },

    Ban {
        server_id: i64,
        userid: i32,

        #[arg(long, default_value = "0")]
        duration: String,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum WhitelistCommand {
    List {
        #[command(flatten)]
        view: ViewArgs,
    },

    Add { steam_id: String, name: String },

    Approve { id: i64 },

    Reject {
        id: i64,

        #[arg(long)]
        reason: Option<String>,

        #[arg(long)]
        yes: bool,
    },

    /// Approve every pending application
    ApproveAll,

    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },

    /// Submit a public application
    Apply { steam_id: String, name: String },

    /// Check an application
    Status { steam_id: String },

    /// Resolve a SteamID or profile URL to a name
    PlayerInfo { steam_id: String },
}

#[derive(Debug, Subcommand)]
enum VerificationCommand {
    List {
        #[command(flatten)]
        view: ViewArgs,
    },

    Set {
        steam_id: String,

        /// pending, allowed or denied
        status: VerificationStatus,

        #[arg(long)]
        reason: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("failed to initialize logging: {e}");
    }

    let client = ApiClient::from_config(&config);
    let (notifier, mut rx) = Notifier::channel();

    tracing::debug!(api = %config.api_base_url, "starting");
    let result = run(args.command, client, notifier).await;
    print_notifications(&mut rx);

    match result? {
        true => Ok(ExitCode::SUCCESS),
        false => Ok(ExitCode::FAILURE),
    }
}

fn print_notifications(rx: &mut UnboundedReceiver<Notification>) {
    for note in drain(rx) {
        let tag = match note.level {
            Level::Success => "ok",
            Level::Info => "info",
            Level::Error => "error",
        };
        println!("[{tag}] {}", note.message);
    }
}

fn finish(outcome: ActionOutcome) -> bool {
    match outcome {
        ActionOutcome::Busy => eprintln!("another action is still pending"),
        ActionOutcome::NothingStaged => eprintln!("nothing to confirm"),
        _ => {}
    }
    outcome.is_done()
}

/// Leaves a staged dialog unconfirmed.
fn needs_confirmation(what: &str) -> anyhow::Result<bool> {
    println!("About to {what}. Re-run with --yes to confirm.");
    Ok(true)
}

fn minutes(raw: &str) -> anyhow::Result<i64> {
    parse_duration_minutes(raw).with_context(|| format!("invalid duration: {raw}"))
}

/// Picks one tab when `--status` is given, everything otherwise.
fn select<'a, T: Bucketed>(tabs: &StatusBuckets<'a, T>, all: Vec<&'a T>, status: Option<&str>) -> Vec<&'a T> {
    match status {
        Some(name) => tabs.get(&name.to_lowercase()).to_vec(),
        None => all,
    }
}

async fn run(command: Command, client: ApiClient, notifier: Notifier) -> anyhow::Result<bool> {
    match command {
        Command::Login { username, password } => {
            let session = auth::login(&client, &username, &password).await?;
            let role = session.role().map(|r| r.label()).unwrap_or("Unknown");
            println!("Logged in as {} ({})", session.username().unwrap_or(username), role);
        }
        Command::Logout => {
            auth::logout(&client)?;
            println!("Logged out");
        }
        Command::Whoami => match auth::current_session(&client) {
            Some(session) => println!(
                "{} ({})",
                session.username().unwrap_or_else(|| "unknown".to_string()),
                session.role().map(|r| r.label()).unwrap_or("Unknown")
            ),
            None => println!("Not logged in"),
        },
        Command::ChangePassword { old, new } => {
            auth::change_password(&client, &old, &new).await?;
            notifier.success("Password changed");
        }
        Command::Bans(cmd) => return bans(cmd, client, notifier).await,
        Command::Admins(cmd) => return admins(cmd, client, notifier).await,
        Command::Groups(cmd) => return groups(cmd, client, notifier).await,
        Command::Servers(cmd) => return servers(cmd, client, notifier).await,
        Command::Whitelist(cmd) => return whitelist(cmd, client, notifier).await,
        Command::Verifications(cmd) => return verifications(cmd, client, notifier).await,
        Command::Logs { view } => {
            auth::require_super_admin(&client)?;
            let logs = LogView::new(client, notifier);
            logs.open().await;
            let items = logs.items();
            for log in logs.search(&items, &view.search) {
                println!(
                    "{:<17} {:<16} {:<20} {:<24} {}",
                    format_time(log.created_at),
                    log.admin_username,
                    log.action,
                    log.target.as_deref().unwrap_or("-"),
                    log.details.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(true)
}

fn print_bans(bans: &[&Ban]) {
    println!(
        "{:>5}  {:<16} {:<20} {:<8} {:<10} {:<12} {}",
        "ID", "NAME", "STEAM ID", "STATUS", "LENGTH", "EXPIRES", "REASON"
    );
    for ban in bans {
        println!(
            "{:>5}  {:<16} {:<20} {:<8} {:<10} {:<12} {}",
            ban.id,
            ban.display_name(),
            ban.steam_id,
            ban.status.label(),
            format_minutes(ban.duration),
            format_time(ban.expires_at),
            ban.reason.as_deref().unwrap_or("")
        );
    }
}

async fn bans(cmd: BanCommand, client: ApiClient, notifier: Notifier) -> anyhow::Result<bool> {
    let view = BanView::new(client, notifier);
    let outcome = match cmd {
        BanCommand::List { view: args } => {
            view.open().await;
            let items = view.items();
            let tabs = view.tabs(&items, &args.search);
            for (name, count) in tabs.counts() {
                print!("{name}: {count}  ");
            }
            println!();
            print_bans(&select(&tabs, filter(&items, &args.search), args.status.as_deref()));
            return Ok(view.controller().error().is_none());
        }
        BanCommand::Public => {
            let list = public_bans(view.controller().client()).await?;
            print_bans(&list.iter().collect::<Vec<_>>());
            return Ok(true);
        }
        BanCommand::Create {
            steam_id,
            name,
            ip,
            ban_type,
            reason,
            duration,
        } => {
            let request = CreateBanRequest {
                name,
                steam_id,
                ip,
                ban_type,
                reason,
                duration: minutes(&duration)?,
                admin_name: auth::current_session(view.controller().client()).and_then(|s| s.username()),
            };
            view.create(request).await
        }
        BanCommand::Lift { id } => view.lift(id).await,
        BanCommand::Reban { id } => view.reban(id).await,
        BanCommand::Delete { id, yes } => {
            view.stage_delete(id);
            if !yes {
                view.delete_dialog().cancel();
                return needs_confirmation(&format!("delete ban #{id}"));
            }
            view.confirm_delete().await
        }
    };
    Ok(finish(outcome))
}

async fn admins(cmd: AdminCommand, client: ApiClient, notifier: Notifier) -> anyhow::Result<bool> {
    let view = AdminView::new(client, notifier);
    let outcome = match cmd {
        AdminCommand::List { view: args } => {
            view.open().await;
            let items = view.items();
            println!("{:>5}  {:<20} {:<12} {:<20} {}", "ID", "USERNAME", "ROLE", "STEAM ID", "REMARK");
            for admin in view.search(&items, &args.search) {
                println!(
                    "{:>5}  {:<20} {:<12} {:<20} {}",
                    admin.id,
                    admin.username,
                    admin.role.label(),
                    admin.steam_id.as_deref().unwrap_or("-"),
                    admin.remark.as_deref().unwrap_or("")
                );
            }
            return Ok(view.controller().error().is_none());
        }
        AdminCommand::Create {
            username,
            password,
            role,
            steam_id,
            remark,
        } => {
            view.create(CreateAdminRequest {
                username,
                password,
                role,
                steam_id,
                remark,
            })
            .await
        }
        AdminCommand::Update {
            id,
            username,
            password,
            role,
            steam_id,
            remark,
        } => {
            view.update(
                id,
                UpdateAdminRequest {
                    username,
                    password,
                    role,
                    steam_id,
                    remark,
                },
            )
            .await
        }
        AdminCommand::Delete { id, yes } => {
            view.stage_deactivate(id);
            if !yes {
                view.deactivate_dialog().cancel();
                return needs_confirmation(&format!("remove admin #{id}"));
            }
            view.confirm_deactivate().await
        }
    };
    Ok(finish(outcome))
}

async fn groups(cmd: GroupCommand, client: ApiClient, notifier: Notifier) -> anyhow::Result<bool> {
    let view = CommunityView::new(client, notifier);
    let outcome = match cmd {
        GroupCommand::List { view: args } => {
            view.open().await;
            let items = view.items();
            for group in view.search(&items, &args.search) {
                println!("#{} {}", group.id, group.name);
                for server in &group.servers {
                    let mode = if server.whitelist_only {
                        "whitelist only".to_string()
                    } else if server.verification_enabled {
                        format!("rating >= {}, level >= {}", server.required_rating, server.required_level)
                    } else {
                        "open".to_string()
                    };
                    println!("    {:>4}  {:<24} {:<22} {}", server.id, server.name, server.address(), mode);
                }
            }
            return Ok(view.controller().error().is_none());
        }
        GroupCommand::Create { name } => view.create_group(&name).await,
        GroupCommand::Delete { id, yes } => {
            view.stage_delete_group(id);
            if !yes {
                return needs_confirmation(&format!("delete group #{id} and its servers"));
            }
            view.confirm_delete_group().await
        }
    };
    Ok(finish(outcome))
}

async fn servers(cmd: ServerCommand, client: ApiClient, notifier: Notifier) -> anyhow::Result<bool> {
    let view = CommunityView::new(client, notifier);
    let outcome = match cmd {
        ServerCommand::Create {
            group_id,
            name,
            ip,
            port,
            rcon_password,
            verification,
            min_rating,
            min_level,
            whitelist_only,
        } => {
            let mut request = CreateServerRequest::blank(group_id);
            request.name = name;
            request.ip = ip;
            request.port = port;
            request.rcon_password = rcon_password;
            request.verification_enabled = verification;
            request.whitelist_only = whitelist_only;
            if let Some(rating) = min_rating {
                request.required_rating = rating;
            }
            if let Some(level) = min_level {
                request.required_level = level;
            }
            view.create_server(request).await
        }
        ServerCommand::Update {
            id,
            name,
            ip,
            port,
            rcon_password,
            verification,
            min_rating,
            min_level,
            whitelist_only,
        } => {
            view.open().await;
            let server = view
                .find_server(id)
                .with_context(|| format!("server #{id} not found"))?;
            let current = UpdateServerRequest::from_server(&server);
            let request = UpdateServerRequest {
                name: name.or(current.name),
                ip: ip.or(current.ip),
                port: port.or(current.port),
                rcon_password: None,
                verification_enabled: verification.or(current.verification_enabled),
                required_rating: min_rating.or(current.required_rating),
                required_level: min_level.or(current.required_level),
                whitelist_only: whitelist_only.or(current.whitelist_only),
            }
            .with_rcon_password(rcon_password);
            view.update_server(id, request).await
        }
        ServerCommand::Delete { id, yes } => {
            view.stage_delete_server(id);
            if !yes {
                return needs_confirmation(&format!("remove server #{id}"));
            }
            view.confirm_delete_server().await
        }
        ServerCommand::Players { id } => {
            let panel = view.players();
            panel.open(id).await;
            println!("{:>6}  {:<24} {:<22} {:<10} {}", "USERID", "NAME", "STEAM ID", "TIME", "PING");
            for player in panel.players().iter() {
                println!(
                    "{:>6}  {:<24} {:<22} {:<10} {}",
                    player.userid, player.name, player.steam_id, player.time, player.ping
                );
            }
            return Ok(true);
        }
        ServerCommand::Kick { server_id, userid, yes } => {
            view.players().open(server_id).await;
            view.stage_kick(userid);
            if !yes {
                return needs_confirmation(&format!("kick userid {userid} from server #{server_id}"));
            }
            view.confirm_kick().await
        }
        ServerCommand::Ban {
            server_id,
            userid,
            duration,
            yes,
        } => {
            let duration = minutes(&duration)?;
            view.players().open(server_id).await;
            view.stage_ban(userid, duration);
            if !yes {
                return needs_confirmation(&format!(
                    "ban userid {userid} on server #{server_id} ({})",
                    format_minutes(duration)
                ));
            }
            view.confirm_ban().await
        }
    };
    Ok(finish(outcome))
}

async fn whitelist(cmd: WhitelistCommand, client: ApiClient, notifier: Notifier) -> anyhow::Result<bool> {
    let view = WhitelistView::new(client, notifier);
    let outcome = match cmd {
        WhitelistCommand::List { view: args } => {
            view.open().await;
            let snapshot = view.snapshot();
            let tabs = view.tabs(&snapshot.entries, &args.search);
            for (name, count) in tabs.counts() {
                print!("{name}: {count}  ");
            }
            println!();

            let shown: Vec<i64> = select(&tabs, filter(&snapshot.entries, &args.search), args.status.as_deref())
                .into_iter()
                .map(|e| e.id)
                .collect();
            for row in snapshot.annotated().iter().filter(|a| shown.contains(&a.entry.id)) {
                let mut flags = Vec::new();
                if let Some(ban) = row.local_ban {
                    flags.push(format!("banned #{}", ban.id));
                }
                if let Some(global) = row.global_ban {
                    flags.push(format!("global ban: {}", global.reason.as_deref().unwrap_or("yes")));
                }
                println!(
                    "{:>5}  {:<20} {:<20} {:<6} {:<10} {}",
                    row.entry.id,
                    row.entry.name,
                    row.entry.steam_id,
                    row.entry.status.label(),
                    if row.entry.is_self_submitted() { "applied" } else { "added" },
                    flags.join(", ")
                );
            }
            return Ok(snapshot.failed_sources.is_empty());
        }
        WhitelistCommand::Add { steam_id, name } => view.add(&steam_id, &name).await,
        WhitelistCommand::Approve { id } => view.approve(id).await,
        WhitelistCommand::Reject { id, reason, yes } => {
            view.stage_reject(id, reason);
            if !yes {
                return needs_confirmation(&format!("reject application #{id}"));
            }
            view.confirm_reject().await
        }
        WhitelistCommand::ApproveAll => {
            view.open().await;
            return Ok(match view.approve_all().await {
                Some(report) => report.failed == 0,
                None => false,
            });
        }
        WhitelistCommand::Delete { id, yes } => {
            view.stage_delete(id);
            if !yes {
                return needs_confirmation(&format!("delete whitelist entry #{id}"));
            }
            view.confirm_delete().await
        }
        WhitelistCommand::Apply { steam_id, name } => {
            let notifier = view.board().notifier();
            return Ok(match apply(view.board().client(), &steam_id, &name).await? {
                ApplyOutcome::Submitted => {
                    notifier.success("Application submitted. Please wait for admin approval.");
                    true
                }
                ApplyOutcome::Duplicate { status, message } => {
                    let status = status.map(|s| s.label()).unwrap_or("unknown");
                    notifier.error(format!("Submit failed: {message} (current status: {status})"));
                    false
                }
            });
        }
        WhitelistCommand::Status { steam_id } => {
            let status = application_status(view.board().client(), &steam_id).await?;
            println!("{}", status.status.label());
            if let Some(reason) = status.reject_reason {
                println!("reason: {reason}");
            }
            return Ok(true);
        }
        WhitelistCommand::PlayerInfo { steam_id } => {
            let info = player_info(view.board().client(), &steam_id).await?;
            println!("{} {}", info.personaname, info.steam_id_64.unwrap_or_default());
            return Ok(true);
        }
    };
    Ok(finish(outcome))
}

async fn verifications(cmd: VerificationCommand, client: ApiClient, notifier: Notifier) -> anyhow::Result<bool> {
    auth::require_super_admin(&client)?;
    let view = VerificationView::new(client, notifier);
    let outcome = match cmd {
        VerificationCommand::List { view: args } => {
            view.open().await;
            let items = view.items();
            let tabs = view.tabs(&items, &args.search);
            for (name, count) in tabs.counts() {
                print!("{name}: {count}  ");
            }
            println!();
            for record in select(&tabs, filter(&items, &args.search), args.status.as_deref()) {
                let risk = record
                    .risk_hint()
                    .map(|r| format!("~{r}"))
                    .unwrap_or_else(|| "-".to_string());
                let hours = record
                    .playtime_hours()
                    .map(|h| format!("{h:.1}h"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<20} {:<8} {:>5} {:>8} {:>5}  {}",
                    record.steam_id,
                    record.status.label(),
                    record.steam_level.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
                    hours,
                    risk,
                    record.reason.as_deref().unwrap_or("")
                );
            }
            return Ok(view.controller().error().is_none());
        }
        VerificationCommand::Set {
            steam_id,
            status,
            reason,
        } => view.set_status(&steam_id, status, reason).await,
    };
    Ok(finish(outcome))
}
