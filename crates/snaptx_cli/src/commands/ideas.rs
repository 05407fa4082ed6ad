//! Idea board: ideas stored as text files, edited in transactions.

use super::CommandError;
use snaptx_core::{CommitOutcome, TransactionManager};
use std::fs;
use std::path::Path;
use tracing::info;

/// Directory under the volume holding idea files.
pub const IDEAS_DIR: &str = "ideas";

/// Returns the file name for an idea: `idea_<title>.txt`, with every run of
/// whitespace in the title replaced by one `_`.
pub fn idea_file_name(title: &str) -> String {
    let mut name = String::from("idea_");
    let mut in_space = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    name.push_str(".txt");
    name
}

/// Returns the initial content of an idea file.
pub fn idea_document(title: &str, content: &str) -> String {
    format!("Title: {title}\n{content}\n\nComments:\n")
}

fn check_file_name(name: &str) -> Result<(), CommandError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CommandError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn committed(outcome: CommitOutcome) -> Result<(), CommandError> {
    match outcome {
        CommitOutcome::Committed => Ok(()),
        CommitOutcome::Conflict { path, .. } => {
            Err(CommandError::Conflict(path.display().to_string()))
        }
    }
}

/// Creates a new idea file in one transaction.
pub fn add(
    manager: &TransactionManager,
    ideas_dir: &Path,
    title: &str,
    content: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let file_name = idea_file_name(title);
    check_file_name(&file_name)?;
    fs::create_dir_all(ideas_dir)?;

    let mut tx = manager.begin()?;
    tx.write(ideas_dir.join(&file_name), idea_document(title, content))?;
    committed(tx.commit()?)?;

    info!(file = %file_name, "idea added");
    Ok(file_name)
}

/// Lists idea file names, sorted.
pub fn list(ideas_dir: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if !ideas_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(ideas_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Appends a comment line to an existing idea in one transaction.
pub fn comment(
    manager: &TransactionManager,
    ideas_dir: &Path,
    file_name: &str,
    comment: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    check_file_name(file_name)?;
    let path = ideas_dir.join(file_name);
    if !path.is_file() {
        return Err(CommandError::NotFound(file_name.to_string()).into());
    }

    let mut tx = manager.begin()?;
    let current = tx.read_to_string(&path)?;
    tx.write(&path, format!("{current}{comment}\n"))?;
    committed(tx.commit()?)?;

    info!(file = %file_name, "comment added");
    Ok(())
}

/// Runs `ideas add`.
pub fn run_add(
    manager: &TransactionManager,
    ideas_dir: &Path,
    title: &str,
    content: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let file_name = add(manager, ideas_dir, title, content)?;
    println!("✓ Idea added: {file_name}");
    Ok(())
}

/// Runs `ideas list`.
pub fn run_list(ideas_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let names = list(ideas_dir)?;
    if names.is_empty() {
        println!("No ideas yet.");
        return Ok(());
    }
    println!("Ideas:");
    for name in names {
        println!("- {name}");
    }
    Ok(())
}

/// Runs `ideas comment`.
pub fn run_comment(
    manager: &TransactionManager,
    ideas_dir: &Path,
    file_name: &str,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    comment(manager, ideas_dir, file_name, text)?;
    println!("✓ Comment added to {file_name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::environment;

    #[test]
    fn file_name_collapses_whitespace() {
        assert_eq!(idea_file_name("My Idea"), "idea_My_Idea.txt");
        assert_eq!(idea_file_name("a \t b"), "idea_a_b.txt");
        assert_eq!(idea_file_name(" lead"), "idea__lead.txt");
        assert_eq!(idea_file_name(""), "idea_.txt");
    }

    #[test]
    fn document_layout() {
        assert_eq!(
            idea_document("Cats", "More cats."),
            "Title: Cats\nMore cats.\n\nComments:\n"
        );
    }

    #[test]
    fn rejects_path_separators() {
        assert!(check_file_name("idea_a/b.txt").is_err());
        assert!(check_file_name("..").is_err());
        assert!(check_file_name("idea_ok.txt").is_ok());
    }

    #[test]
    fn add_list_comment() {
        let (_dir, env) = environment();
        let manager = env.manager().unwrap();
        let ideas = env.path(IDEAS_DIR);

        let name = add(&manager, &ideas, "Green roof", "Plant the roof.").unwrap();
        assert_eq!(name, "idea_Green_roof.txt");
        assert_eq!(list(&ideas).unwrap(), vec![name.clone()]);

        comment(&manager, &ideas, &name, "Needs a permit").unwrap();
        comment(&manager, &ideas, &name, "Cheap in summer").unwrap();

        assert_eq!(
            fs::read_to_string(ideas.join(&name)).unwrap(),
            "Title: Green roof\nPlant the roof.\n\nComments:\nNeeds a permit\nCheap in summer\n"
        );
    }

    #[test]
    fn comment_on_missing_idea() {
        let (_dir, env) = environment();
        let manager = env.manager().unwrap();

        let err = comment(&manager, &env.path(IDEAS_DIR), "idea_none.txt", "x").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn list_without_directory() {
        let (_dir, env) = environment();
        assert!(list(&env.path(IDEAS_DIR)).unwrap().is_empty());
    }
}
