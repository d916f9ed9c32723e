//! Handlers for session-gated resource commands.

use super::{
    ApiResourcesArgs, ApiResourcesCommands, AppContext, ApplicationsArgs, ApplicationsCommands,
    SessionArgs,
};
use crate::auth::SessionGuard;
use crate::error::CliError;
use crate::management::{ManagementClient, NewApiResource, NewApplication};

/// Approve the session for `args.tenant` (or the default) and build a client for it.
pub fn authenticated_client(
    args: &SessionArgs,
    ctx: &AppContext,
) -> Result<ManagementClient, CliError> {
    let registry = ctx.settings.load_registry()?;
    let session = SessionGuard::new(&registry, ctx.store.as_ref(), ctx.settings.skew_margin)
        .ensure_authenticated(args.tenant.as_deref())?;
    Ok(session
        .management_client(&ctx.settings.issuer)
        .with_timeout(ctx.settings.http_timeout)
        .with_cancellation(ctx.cancel.clone()))
}

pub async fn handle_applications(args: ApplicationsArgs, ctx: &AppContext) -> Result<(), CliError> {
    let client = authenticated_client(&args.session, ctx)?;
    match args.command {
        ApplicationsCommands::List => {
            let list = client.list_applications().await?;
            if list.applications.is_empty() {
                println!("No applications in tenant {}", client.tenant());
            }
            for app in &list.applications {
                println!(
                    "{:<38} {:<32} {}",
                    app.id,
                    app.name,
                    app.client_id.as_deref().unwrap_or("-")
                );
            }
        }
        ApplicationsCommands::Create {
            name,
            description,
            template_id,
        } => {
            let id = client
                .create_application(&NewApplication {
                    name: name.clone(),
                    description,
                    template_id,
                })
                .await?;
            match id {
                Some(id) => println!("Created application {name} ({id})"),
                None => println!("Created application {name}"),
            }
        }
        ApplicationsCommands::Delete { id } => {
            client.delete_application(&id).await?;
            println!("Deleted application {id}");
        }
    }
    Ok(())
}

pub async fn handle_api_resources(
    args: ApiResourcesArgs,
    ctx: &AppContext,
) -> Result<(), CliError> {
    let client = authenticated_client(&args.session, ctx)?;
    match args.command {
        ApiResourcesCommands::List { kind } => {
            let list = client.list_api_resources(kind.as_deref()).await?;
            if list.api_resources.is_empty() {
                println!("No API resources in tenant {}", client.tenant());
            }
            for resource in &list.api_resources {
                println!(
                    "{:<38} {:<28} {:<10} {}",
                    resource.id,
                    resource.name,
                    resource.kind.as_deref().unwrap_or("-"),
                    resource.identifier
                );
            }
        }
        ApiResourcesCommands::Get { id } => {
            let resource = client.get_api_resource(&id).await?;
            println!("ID:                     {}", resource.id);
            println!("Name:                   {}", resource.name);
            println!("Identifier:             {}", resource.identifier);
            println!("Type:                   {}", resource.kind.as_deref().unwrap_or("-"));
            println!("Requires authorization: {}", resource.requires_authorization);
            for property in &resource.properties {
                println!("  {} = {}", property.name, property.value);
            }
        }
        ApiResourcesCommands::Create {
            name,
            identifier,
            requires_authorization,
        } => {
            let id = client
                .create_api_resource(&NewApiResource {
                    name: name.clone(),
                    identifier,
                    requires_authorization,
                })
                .await?;
            match id {
                Some(id) => println!("Created API resource {name} ({id})"),
                None => println!("Created API resource {name}"),
            }
        }
        ApiResourcesCommands::Delete { id } => {
            client.delete_api_resource(&id).await?;
            println!("Deleted API resource {id}");
        }
    }
    Ok(())
}
