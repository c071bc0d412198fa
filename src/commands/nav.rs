//! Navigation commands: ls, cd

use crate::commands::CommandError;
use crate::fs::FileSystem;
use crate::session::SessionState;
use crate::vpath;

/// List the immediate children of the current directory, two-space joined.
pub async fn list(
    fs: &dyn FileSystem,
    root: &str,
    state: &SessionState,
) -> Result<String, CommandError> {
    let physical = vpath::to_physical(state.current_dir(), root);
    if !fs.exists(&physical).await {
        return Err(CommandError::PathNotFound(state.current_dir().to_string()));
    }
    let names = fs.readdir(&physical).await?;
    Ok(names.join("  "))
}

/// Change the current directory.
///
/// `..` is a pure logical transform and is committed without touching
/// storage; every other target must resolve to an existing directory. On
/// failure the session state is left untouched.
pub async fn change_directory(
    fs: &dyn FileSystem,
    root: &str,
    state: &mut SessionState,
    argument: &str,
) -> Result<String, CommandError> {
    if argument == ".." {
        let parent = vpath::parent(state.current_dir());
        state.set_current_dir(parent);
        return Ok(confirmation(state.current_dir()));
    }

    let target = vpath::resolve(argument, state.current_dir());
    let physical = vpath::to_physical(&target, root);
    match fs.stat(&physical).await {
        Ok(stat) if stat.is_directory => {
            state.set_current_dir(target);
            Ok(confirmation(state.current_dir()))
        }
        _ => Err(CommandError::DirectoryNotFound(argument.to_string())),
    }
}

fn confirmation(dir: &str) -> String {
    format!("Changed directory to '{}'.", dir)
}
