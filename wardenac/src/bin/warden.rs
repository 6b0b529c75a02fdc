use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use wardenac::{
    platform::Builder as PlatformBuilder,
    Platform,
};
use wardencore::{
    ac::{
        predicate::IdFilter,
        Permission,
        Privilege,
        Record,
        Value,
    },
    platform::ConnectorOption,
};
use wardendb_sqlite::SqliteBackend;
use wardenrbac::{
    grant::grantable_privileges,
    Builder as CatalogBuilder,
    Context,
    Principal,
};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[clap(long, value_name = "WARDEN_DB_URL", env = "WARDEN_DB_URL")]
    warden_db_url: String,
    /// Path to the JSON class declarations
    #[clap(long, value_name = "WARDEN_CATALOG", env = "WARDEN_CATALOG")]
    warden_catalog: PathBuf,
    /// Make changes as this user, subject to their grants; without it
    /// changes are made with administrative access.
    #[clap(long)]
    as_user: Option<String>,
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(arg_required_else_help = true)]
    User {
        #[command(subcommand)]
        cmd: UserCmd,
    },
    #[command(arg_required_else_help = true)]
    Role {
        #[command(subcommand)]
        cmd: RoleCmd,
    },
    #[command(arg_required_else_help = true)]
    Permission {
        #[command(subcommand)]
        cmd: PermissionCmd,
    },
    /// Decides whether the user holds the privilege on the object
    #[command(arg_required_else_help = true)]
    Check {
        login: String,
        privilege: String,
        /// The object as a JSON record
        object: String,
    },
    /// Lists the users holding the privilege on the object
    #[command(arg_required_else_help = true)]
    UsersPermitted {
        privilege: String,
        /// The object as a JSON record
        object: String,
    },
}

#[derive(Debug, Subcommand)]
enum UserCmd {
    #[command(arg_required_else_help = true)]
    Create {
        name: String,
        #[arg(long)]
        firm_id: Option<i64>,
    },
    /// Reports the roles, permissions and grants of the user
    #[command(arg_required_else_help = true)]
    Status {
        name: String,
    },
}

#[derive(Debug, Subcommand)]
enum RoleCmd {
    #[command(arg_required_else_help = true)]
    Create {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        firm_id: Option<i64>,
    },
    #[command(arg_required_else_help = true)]
    Assign {
        login: String,
        role_id: i64,
        /// Unix timestamp after which the assignment lapses
        #[arg(long)]
        until: Option<i64>,
    },
    #[command(arg_required_else_help = true)]
    Expire {
        assignment_id: i64,
        /// Unix timestamp; omit to make the assignment permanent
        #[arg(long)]
        at: Option<i64>,
    },
    #[command(arg_required_else_help = true)]
    Remove {
        assignment_id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum PermissionCmd {
    #[command(arg_required_else_help = true)]
    Create {
        role_id: i64,
        privilege: String,
        class_name: String,
        #[arg(long)]
        grant: bool,
        #[arg(long)]
        grant_option: bool,
        #[arg(long)]
        owned_by_self: bool,
        /// An access control key constraint as KEY=VALUE
        #[arg(long = "target", value_parser = parse_target)]
        targets: Vec<(String, Value)>,
    },
    #[command(arg_required_else_help = true)]
    Remove {
        id: i64,
    },
    /// Lists what each grant held by the user allows them to grant
    #[command(arg_required_else_help = true)]
    Grantable {
        login: String,
    },
}

fn parse_target(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s.split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    let value = if let Ok(v) = value.parse::<i64>() {
        Value::Integer(v)
    } else if let Ok(v) = value.parse::<bool>() {
        Value::Boolean(v)
    } else {
        Value::Text(value.to_string())
    };
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    stderrlog::new()
        .module(module_path!())
        .module("wardenac")
        .module("wardendb_sqlite")
        .module("wardenrbac")
        .verbosity((args.verbose as usize) + 1)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let catalog = CatalogBuilder::from_json(
        &std::fs::read_to_string(&args.warden_catalog)?
    )?.build()?;
    let backend = SqliteBackend::access(
        ConnectorOption::from(&args.warden_db_url)
            .create_db(true)
    ).await?;
    let platform = PlatformBuilder::new()
        .access_platform(backend.clone())
        .catalog(catalog)
        .build()?;
    let acting = match &args.as_user {
        Some(login) => Some(platform.principal_by_name(login, false).await?),
        None => None,
    };

    match args.command {
        Commands::User { cmd } => {
            parse_user(&platform, cmd).await?;
        },
        Commands::Role { cmd } => {
            parse_role(&platform, acting, cmd).await?;
        },
        Commands::Permission { cmd } => {
            parse_permission(&platform, acting, cmd).await?;
        },
        Commands::Check { login, privilege, object } => {
            let privilege = privilege.parse::<Privilege>()?;
            let object: Record = serde_json::from_str(&object)?;
            let principal = platform.principal_by_name(&login, false).await?;
            let instant = Instant::now();
            let permit = if platform.engine().can(&principal, &privilege, &object) {
                "permitted"
            } else if platform.engine().could_ever(&principal, &privilege, &object.class_name) {
                "not permitted (though permitted on other objects of the class)"
            } else {
                "not permitted"
            };
            let elapsed = instant.elapsed();
            println!("{login} {permit} to {privilege} the object; decided in {elapsed:?}");
        },
        Commands::UsersPermitted { privilege, object } => {
            let privilege = privilege.parse::<Privilege>()?;
            let object: Record = serde_json::from_str(&object)?;
            let predicate = platform.users_permitted(&privilege, &object).await?;
            let filter = IdFilter::new(platform.engine().catalog().user_table(), predicate);
            let fragment = filter.to_sql();
            log::debug!("{} {:?}", fragment.sql, fragment.binds);
            for id in backend.select_ids(&filter).await? {
                match platform.access_platform().get_user_by_id(id).await? {
                    Some(user) => println!("{} ({id})", user.name),
                    None => println!("({id})"),
                }
            }
        },
    }

    Ok(())
}

async fn parse_user(
    platform: &Platform,
    arg: UserCmd,
) -> anyhow::Result<()> {
    match arg {
        UserCmd::Create { name, firm_id } => {
            let id = platform.access_platform().add_user(&name, firm_id).await?;
            println!("user {name:?} created with id {id}");
        }
        UserCmd::Status { name } => {
            let principal = platform.principal_by_name(&name, true).await?;
            let user = principal.user();
            println!("id: {}", user.id);
            println!("name: {}", user.name);
            if let Some(firm_id) = user.firm_id {
                println!("firm_id: {firm_id}");
            }
            for assignment in principal.assignments() {
                let status = if assignment.is_current(principal.as_of()) {
                    "current"
                } else {
                    "lapsed"
                };
                println!(
                    "assignment {}: role {} ({status})",
                    assignment.id,
                    assignment.role_id,
                );
            }
            println!("effective role(s): {:?}", principal.roles());
            for permission in principal.permissions().iter().chain(principal.grants()) {
                println!("{}", serde_json::to_string(permission)?);
            }
        }
    }
    Ok(())
}

async fn parse_role(
    platform: &Platform,
    acting: Option<Arc<Principal>>,
    arg: RoleCmd,
) -> anyhow::Result<()> {
    let ctx = acting.as_deref()
        .map(Context::for_user);
    match arg {
        RoleCmd::Create { name, parent, firm_id } => {
            let id = platform.access_platform().add_role(&name, parent, firm_id).await?;
            println!("role {name:?} created with id {id}");
        }
        RoleCmd::Assign { login, role_id, until } => {
            let principal = platform.principal_by_name(&login, false).await?;
            let user_id = principal.user().id;
            let id = match &ctx {
                Some(ctx) => platform.assign_role(ctx, user_id, role_id, until).await?.id,
                None => platform.access_platform()
                    .add_role_assignment(user_id, role_id, until)
                    .await?,
            };
            println!("role {role_id} assigned to {login} as assignment {id}");
        }
        RoleCmd::Expire { assignment_id, at } => {
            match &ctx {
                Some(ctx) => {
                    platform.expire_role_assignment(ctx, assignment_id, at).await?;
                }
                None => {
                    platform.access_platform()
                        .set_role_assignment_invalid_after(assignment_id, at)
                        .await?;
                }
            }
            match at {
                Some(at) => println!("assignment {assignment_id} lapses after {at}"),
                None => println!("assignment {assignment_id} no longer lapses"),
            }
        }
        RoleCmd::Remove { assignment_id } => {
            let removed = match &ctx {
                Some(ctx) => {
                    platform.remove_role_assignment(ctx, assignment_id).await?;
                    true
                }
                None => platform.access_platform()
                    .remove_role_assignment(assignment_id)
                    .await?,
            };
            if removed {
                println!("assignment {assignment_id} removed");
            } else {
                println!("no assignment {assignment_id} to be removed");
            }
        }
    }
    Ok(())
}

async fn parse_permission(
    platform: &Platform,
    acting: Option<Arc<Principal>>,
    arg: PermissionCmd,
) -> anyhow::Result<()> {
    let ctx = acting.as_deref()
        .map(Context::for_user);
    match arg {
        PermissionCmd::Create {
            role_id,
            privilege,
            class_name,
            grant,
            grant_option,
            owned_by_self,
            targets,
        } => {
            let permission = targets.into_iter()
                .fold(
                    Permission::new(role_id, privilege.parse::<Privilege>()?, class_name.as_str())
                        .grant(grant)
                        .grant_option(grant_option)
                        .owned_by_self(owned_by_self),
                    |permission, (key, value)| permission.target(key, value),
                );
            let permission = match &ctx {
                Some(ctx) => platform.create_permission(ctx, permission).await?,
                None => {
                    platform.engine().catalog().validate_permission(&permission)?;
                    let id = platform.access_platform().add_permission(&permission).await?;
                    permission.id(id)
                }
            };
            println!("{}", serde_json::to_string_pretty(&permission)?);
        }
        PermissionCmd::Remove { id } => {
            match &ctx {
                Some(ctx) => {
                    platform.destroy_permission(ctx, id).await?;
                }
                None => {
                    platform.access_platform().remove_permission(id).await?;
                }
            }
            println!("permission {id} removed");
        }
        PermissionCmd::Grantable { login } => {
            let principal = platform.principal_by_name(&login, false).await?;
            for grant in principal.grants() {
                let privileges = grantable_privileges(platform.engine().catalog(), grant)
                    .into_iter()
                    .map(|privilege| privilege.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "grant {} on {}: [{privileges}]",
                    grant.id.map(|id| id.to_string()).unwrap_or_default(),
                    grant.class_name,
                );
            }
        }
    }
    Ok(())
}
