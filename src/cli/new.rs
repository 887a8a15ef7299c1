//! `dudu new`: scaffold a project from the embedded starter.

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};

use crate::{
    embed::starter::{FILES, StarterVars},
    generator::create_dir_all,
    log,
};

/// Project name used when the prompt is left empty.
pub const DEFAULT_NAME: &str = "personal-site";

/// Create a project named `name`, prompting on stdin when it is absent.
pub fn new_project(name: Option<&Path>) -> Result<()> {
    println!("dudu {} project creator", env!("CARGO_PKG_VERSION"));

    let root = match name {
        Some(name) => name.to_path_buf(),
        None => {
            let stdin = io::stdin();
            prompt_name(&mut stdin.lock(), &mut io::stdout())?
        }
    };

    let count = create_project(&root)?;
    log!("new"; "wrote {} files", count);
    println!(
        "Project created. Run `cd {} && dudu serve` to start working!",
        root.display()
    );
    Ok(())
}

/// Ask for the project name; empty input or EOF picks [`DEFAULT_NAME`].
fn prompt_name(input: &mut impl BufRead, output: &mut impl Write) -> Result<PathBuf> {
    write!(output, "Project name ({DEFAULT_NAME}): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read project name")?;

    let name = line.trim();
    Ok(PathBuf::from(if name.is_empty() { DEFAULT_NAME } else { name }))
}

/// Write the starter under `root`, which must not exist yet.
///
/// Directories and files are private to the owner.
fn create_project(root: &Path) -> Result<usize> {
    if root.exists() {
        bail!("`{}` already exists, nothing was written", root.display());
    }

    let name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let vars = StarterVars::new(&name);

    for file in FILES {
        let path = file.path(root);
        if let Some(dir) = path.parent() {
            create_dir_all(dir)
                .with_context(|| format!("Failed to create directory `{}`", dir.display()))?;
        }
        write_private(&path, &file.render(&vars))
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
    }

    Ok(FILES.len())
}

fn write_private(path: &Path, content: &str) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prompt_default_name() {
        let mut output = Vec::new();
        let name = prompt_name(&mut "\n".as_bytes(), &mut output).unwrap();
        assert_eq!(name, PathBuf::from(DEFAULT_NAME));
        assert!(String::from_utf8(output).unwrap().contains("(personal-site)"));
    }

    #[test]
    fn test_prompt_eof_uses_default() {
        let name = prompt_name(&mut "".as_bytes(), &mut Vec::new()).unwrap();
        assert_eq!(name, PathBuf::from(DEFAULT_NAME));
    }

    #[test]
    fn test_prompt_trims_input() {
        let name = prompt_name(&mut "  notes \n".as_bytes(), &mut Vec::new()).unwrap();
        assert_eq!(name, PathBuf::from("notes"));
    }

    #[test]
    fn test_create_project_layout() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("garden");

        let count = create_project(&root).unwrap();
        assert_eq!(count, FILES.len());
        assert!(root.join("md/index.md").is_file());
        assert!(root.join("md/style.css").is_file());
        assert!(root.join("resources/template.html").is_file());
        assert!(root.join("resources/hotreload.html").is_file());

        let index = fs::read_to_string(root.join("md/index.md")).unwrap();
        assert!(index.contains("garden"));
    }

    #[cfg(unix)]
    #[test]
    fn test_create_project_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join("site");
        create_project(&root).unwrap();

        let dir_mode = fs::metadata(root.join("md")).unwrap().permissions().mode();
        let file_mode = fs::metadata(root.join("md/index.md")).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o077, 0);
        assert_eq!(file_mode & 0o077, 0);
    }

    #[test]
    fn test_existing_directory_refused() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep.txt"), "mine").unwrap();

        let err = create_project(temp.path()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(!temp.path().join("md").exists());
        assert_eq!(fs::read_to_string(temp.path().join("keep.txt")).unwrap(), "mine");
    }
}
