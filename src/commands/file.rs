//! File content commands: cat, tac, head

use crate::commands::CommandError;
use crate::fs::FileSystem;
use crate::vpath;

const DEFAULT_HEAD_LINES: usize = 10;

/// Resolve `name` against the current directory and read it, requiring a
/// regular file at the physical location.
async fn read_regular_file(
    fs: &dyn FileSystem,
    root: &str,
    current_dir: &str,
    name: &str,
) -> Result<String, CommandError> {
    let logical = vpath::resolve(name, current_dir);
    let physical = vpath::to_physical(&logical, root);
    match fs.stat(&physical).await {
        Ok(stat) if stat.is_file => Ok(fs.read_file(&physical).await?),
        _ => Err(CommandError::FileNotFound(name.to_string())),
    }
}

/// Full verbatim content.
pub async fn cat(
    fs: &dyn FileSystem,
    root: &str,
    current_dir: &str,
    name: &str,
) -> Result<String, CommandError> {
    read_regular_file(fs, root, current_dir, name).await
}

/// Lines in reverse order, newline-joined.
pub async fn tac(
    fs: &dyn FileSystem,
    root: &str,
    current_dir: &str,
    name: &str,
) -> Result<String, CommandError> {
    let content = read_regular_file(fs, root, current_dir, name).await?;
    let mut lines: Vec<&str> = content.lines().collect();
    lines.reverse();
    Ok(lines.join("\n"))
}

/// First `n` lines; the whole content verbatim when `n` covers the file.
///
/// Accepts either `[file]` or `[count, .., file]`, mirroring the tolerant
/// argument handling of the interface being reproduced: with two or more
/// tokens the first is the count and the last is the filename.
pub async fn head(
    fs: &dyn FileSystem,
    root: &str,
    current_dir: &str,
    args: &[&str],
) -> Result<String, CommandError> {
    let (count, name) = match args {
        [] => {
            return Err(CommandError::Malformed(
                "head: missing file operand".to_string(),
            ))
        }
        [name] => (DEFAULT_HEAD_LINES, *name),
        [count, .., name] => {
            let n = count.parse::<usize>().map_err(|_| {
                CommandError::Malformed(format!("invalid line count '{}'", count))
            })?;
            (n, *name)
        }
    };

    let content = read_regular_file(fs, root, current_dir, name).await?;
    let lines: Vec<&str> = content.lines().collect();
    if count >= lines.len() {
        return Ok(content);
    }
    Ok(lines[..count].join("\n"))
}
