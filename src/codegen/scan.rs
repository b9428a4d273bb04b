//! Source tree scanning.
//!
//! Walks the configured root, keeps files matching an include pattern and no
//! exclude pattern, and runs the matching front end on each: TOML manifests
//! through the manifest reader, everything else through the decorator parser.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::codegen::types::{CodegenError, CodegenResult, SkippedMember};
use crate::config::schema::CodegenConfig;
use crate::descriptor::{extract_source, parse_manifest, DescriptorError, ServiceDescriptor};

/// Descriptors found under one root.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub files: Vec<PathBuf>,
    pub services: Vec<ServiceDescriptor>,
    pub skipped: Vec<SkippedMember>,
}

fn glob_set(patterns: &[String]) -> CodegenResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Files under `root` selected by the include and exclude patterns, sorted.
pub fn select_files(root: &Path, include: &[String], exclude: &[String]) -> CodegenResult<Vec<PathBuf>> {
    let include = glob_set(include)?;
    let exclude = glob_set(exclude)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if include.is_match(relative) && !exclude.is_match(relative) {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

/// Run the right front end on one file.
pub fn scan_file(path: &Path) -> CodegenResult<(Vec<ServiceDescriptor>, Vec<SkippedMember>)> {
    let content = std::fs::read_to_string(path).map_err(|source| CodegenError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let skipped = |error| SkippedMember {
        file: path.to_path_buf(),
        error,
    };

    if path.extension().is_some_and(|ext| ext == "toml") {
        return Ok(match parse_manifest(&content) {
            Ok(services) => (services, Vec::new()),
            Err(e) => (Vec::new(), vec![skipped(e)]),
        });
    }

    let extraction = extract_source(&content);
    let errors = extraction.errors.into_iter().map(skipped).collect();
    Ok((extraction.services, errors))
}

/// Scan the tree described by `config`.
///
/// Service names must be unique across the tree: the first file in walk order
/// keeps the name, later ones are reported as skipped.
pub fn scan(config: &CodegenConfig) -> CodegenResult<ScanOutput> {
    let root = Path::new(&config.root);
    let files = select_files(root, &config.include, &config.exclude)?;

    let mut output = ScanOutput::default();
    let mut seen = HashSet::new();
    for file in files {
        let (found, mut skipped) = scan_file(&file)?;
        let mut services = Vec::with_capacity(found.len());
        for service in found {
            if seen.insert(service.name.clone()) {
                services.push(service);
            } else {
                skipped.push(SkippedMember {
                    file: file.clone(),
                    error: DescriptorError::DuplicateService {
                        service: service.name,
                    },
                });
            }
        }
        for member in &skipped {
            tracing::warn!(file = %member.file.display(), error = %member.error, "Member skipped");
        }
        tracing::debug!(file = %file.display(), services = services.len(), "Scanned source unit");
        output.services.extend(services);
        output.skipped.extend(skipped);
        output.files.push(file);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_select_and_scan() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/users/users.controller.ts",
            "@Controller('users')\nexport class UsersController {\n  @Get(':id')\n  findOne(@Param('id') id: string) {}\n}\n",
        );
        write(
            root,
            "api/orders.endpoints.toml",
            "[[service]]\nname = \"Orders\"\n\n[[service.method]]\nname = \"list\"\nverb = \"GET\"\npath = \"/orders\"\n",
        );
        write(root, "node_modules/lib/x.controller.ts", "@Controller() class X {}");
        write(root, "README.md", "nothing");

        let config = CodegenConfig {
            root: root.to_string_lossy().into_owned(),
            ..CodegenConfig::default()
        };
        let output = scan(&config).unwrap();

        assert_eq!(output.files.len(), 2);
        let mut names: Vec<&str> = output.services.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Orders", "UsersController"]);
        assert!(output.skipped.is_empty());
    }

    #[test]
    fn test_duplicate_service_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let source = "@Controller('users')\nexport class UsersController {\n  @Get()\n  list() {}\n}\n";
        write(root, "a/users.controller.ts", source);
        write(root, "b/users.controller.ts", source);

        let config = CodegenConfig {
            root: root.to_string_lossy().into_owned(),
            ..CodegenConfig::default()
        };
        let output = scan(&config).unwrap();

        assert_eq!(output.files.len(), 2);
        assert_eq!(output.services.len(), 1);
        assert_eq!(output.skipped.len(), 1);
        assert!(output.skipped[0].file.ends_with("b/users.controller.ts"));
        assert_eq!(
            output.skipped[0].error,
            DescriptorError::DuplicateService {
                service: "UsersController".into()
            }
        );
    }

    #[test]
    fn test_bad_manifest_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.endpoints.toml", "[[service]\n");
        let (services, skipped) = scan_file(&dir.path().join("bad.endpoints.toml")).unwrap();
        assert!(services.is_empty());
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_invalid_glob() {
        let dir = tempfile::tempdir().unwrap();
        let result = select_files(dir.path(), &["[".to_string()], &[]);
        assert!(matches!(result, Err(CodegenError::Glob(_))));
    }
}
