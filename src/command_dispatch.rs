//! Purpose: Hold top-level CLI command dispatch for `tagfolders`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command maps to exactly one `UserFolders` operation.
//! Invariants: Output envelopes are stable: `{"folder"}`, `{"folders"}`, `{"entries"}`, `{"content"}`, `{"deleted"}`.

use super::*;

pub(super) fn dispatch_command(command: Command, folders: &UserFolders) -> Result<RunOutcome, Error> {
    match command {
        Command::Whoami => {
            emit_json(json!({ "identity": folders.identity()? }));
        }
        Command::Create {
            name,
            color,
            parent,
        } => {
            let folder = folders.create_folder(&name, &color, parent.as_deref())?;
            emit_json(json!({ "folder": folder }));
        }
        Command::Update { uuid, name, color } => {
            if name.is_none() && color.is_none() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("update needs --name or --color")
                    .with_hint("Use `tagfolders update <uuid> --name <name>`."));
            }
            let folder = folders.update_folder(&uuid, name.as_deref(), color.as_deref())?;
            emit_json(json!({ "folder": folder }));
        }
        Command::Move { uuid, parent } => {
            let folder = folders.move_folder(&uuid, parent.as_deref())?;
            emit_json(json!({ "folder": folder }));
        }
        Command::Get { uuid } => {
            let folder = folders.get_folder(&uuid)?.ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("folder with uuid {uuid} not found"))
                    .with_resource(uuid.clone())
            })?;
            emit_json(json!({ "folder": folder }));
        }
        Command::Ls { parent, all } => {
            let list = if all {
                folders.list_all_folders()?
            } else {
                folders.list_next_folder_level(parent.as_deref())?
            };
            emit_json(json!({ "folders": list }));
        }
        Command::Content { uuid } => {
            let entries = folders.get_folder_content(&uuid)?;
            emit_json(json!({ "entries": entries }));
        }
        Command::Add {
            uuid,
            identifier,
            resource_type,
        } => {
            let content = folders.add_content_to_folder(&uuid, &resource_type, &identifier)?;
            emit_json(json!({ "content": content }));
        }
        Command::Remove {
            uuid,
            identifier,
            resource_type,
        } => {
            folders.remove_content_from_folder(&uuid, &resource_type, &identifier)?;
            emit_json(json!({
                "removed": { "type": resource_type, "identifier": identifier, "folder_uuid": uuid }
            }));
        }
        Command::Rm { uuid } => {
            folders.delete_folder(&uuid)?;
            emit_json(json!({ "deleted": [uuid] }));
        }
        Command::RmAll { yes } => {
            if !yes {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("rm-all deletes every folder of this identity")
                    .with_hint("Re-run with --yes to confirm."));
            }
            folders.delete_all_folders()?;
            emit_json(json!({ "deleted": "all" }));
        }
    }
    Ok(RunOutcome::ok())
}
