//! Script loading with `import` resolution.
//!
//! Imports are resolved relative to the importing file. Every file is
//! loaded once; the result lists dependencies before the scripts that
//! import them, ending with the entry script.

use crate::error::CliError;
use macroni_parser::{parse_program_with_source, Program};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LoadedScript {
    pub path: PathBuf,
    pub source: String,
    pub program: Program,
}

impl LoadedScript {
    /// Name used in diagnostics
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Load `entry` and everything it imports, dependencies first
pub fn load_with_imports(entry: &Path) -> Result<Vec<LoadedScript>, CliError> {
    let mut loader = Loader::default();
    loader.visit(entry)?;
    Ok(loader.ordered)
}

#[derive(Default)]
struct Loader {
    ordered: Vec<LoadedScript>,
    loaded: HashSet<PathBuf>,
    /// Files whose imports are still being resolved
    stack: Vec<PathBuf>,
}

impl Loader {
    fn visit(&mut self, path: &Path) -> Result<(), CliError> {
        let canonical = fs::canonicalize(path).map_err(|e| CliError::read(path, e))?;

        if let Some(start) = self.stack.iter().position(|open| *open == canonical) {
            let chain: Vec<String> = self.stack[start..]
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect();
            return Err(CliError::ImportCycle {
                chain: chain.join(" -> "),
            });
        }
        if self.loaded.contains(&canonical) {
            return Ok(());
        }

        let source = fs::read_to_string(&canonical).map_err(|e| CliError::read(path, e))?;
        let program = parse_program_with_source(&source, Some(path.display().to_string()))?;

        let base = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
        let imports: Vec<PathBuf> = program
            .imports()
            .map(|import| base.join(&import.path))
            .collect();

        self.stack.push(canonical.clone());
        for import in &imports {
            tracing::debug!(from = %path.display(), import = %import.display(), "resolving import");
            self.visit(import)?;
        }
        self.stack.pop();

        self.loaded.insert(canonical);
        self.ordered.push(LoadedScript {
            path: path.to_path_buf(),
            source,
            program,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, source).unwrap();
        path
    }

    fn file_names(scripts: &[LoadedScript]) -> Vec<String> {
        scripts
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_script_without_imports() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.macroni", "x = 1;");

        let scripts = load_with_imports(&main).unwrap();
        assert_eq!(file_names(&scripts), vec!["main.macroni"]);
        assert_eq!(scripts[0].source, "x = 1;");
    }

    #[test]
    fn test_imports_load_first_and_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "lib/util.macroni", "import \"shared.macroni\"; fn util() { return 1; }");
        write(&dir, "lib/shared.macroni", "fn shared() { return 2; }");
        write(&dir, "other.macroni", "import \"lib/shared.macroni\";");
        let main = write(
            &dir,
            "main.macroni",
            "import \"lib/util.macroni\";\nimport \"other.macroni\";\nutil();",
        );

        let scripts = load_with_imports(&main).unwrap();
        assert_eq!(
            file_names(&scripts),
            vec!["shared.macroni", "util.macroni", "other.macroni", "main.macroni"]
        );
    }

    #[test]
    fn test_import_cycle_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.macroni", "import \"b.macroni\";");
        write(&dir, "b.macroni", "import \"a.macroni\";");

        let error = load_with_imports(&dir.path().join("a.macroni")).unwrap_err();
        let CliError::ImportCycle { chain } = error else {
            panic!("expected an import cycle");
        };
        assert!(chain.contains("a.macroni -> "));
        assert!(chain.ends_with("a.macroni"));
    }

    #[test]
    fn test_missing_import_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.macroni", "import \"nowhere.macroni\";");

        let error = load_with_imports(&main).unwrap_err();
        assert!(matches!(error, CliError::Read { .. }));
    }

    #[test]
    fn test_parse_error_in_import_surfaces() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.macroni", "x = ;");
        let main = write(&dir, "main.macroni", "import \"broken.macroni\";");

        let error = load_with_imports(&main).unwrap_err();
        assert!(matches!(error, CliError::Parse(_)));
    }
}
