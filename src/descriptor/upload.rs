//! File-upload shape inference.
//!
//! # Responsibilities
//! - Classify a parameter's declared type text as single, multiple, or named
//!   multiple file upload
//! - Read field names and max counts from the upload interceptor decorator
//! - Cross-check the two sources and merge them into one `FileUploadSpec`
//!
//! # Design Decisions
//! - Type text is matched with whitespace removed, so formatting never matters
//! - The declared type decides the shape; the interceptor only fills in names
//!   and counts, or the shape when the type is not recognized
//! - Disagreements are logged, never fatal

use once_cell::sync::Lazy;
use regex::Regex;

use crate::contract::{FileFieldInfo, FileUploadSpec, UploadShape};
use crate::descriptor::lexer::{Token, TokenKind};

const FILE_TYPE: &str = r"(?:Express\.Multer\.File|Multer\.File|MulterFile|File|Blob)";

static SINGLE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{FILE_TYPE}$")).expect("valid single-file pattern"));

static MULTIPLE_FILES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?:{FILE_TYPE}\[\]|Array<{FILE_TYPE}>)$"))
        .expect("valid multiple-file pattern")
});

static NAMED_FILES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\{{(?:[A-Za-z_$][\w$]*\??:(?:{FILE_TYPE}\[\]|Array<{FILE_TYPE}>|{FILE_TYPE})[;,]?)+\}}$"
    ))
    .expect("valid named-files pattern")
});

static NAMED_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"([A-Za-z_$][\w$]*)\??:({FILE_TYPE}\[\]|Array<{FILE_TYPE}>|{FILE_TYPE})"
    ))
    .expect("valid named-field pattern")
});

/// Shape recognized from a declared type alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Single,
    Multiple,
    Named(Vec<FileFieldInfo>),
}

/// Match declared type text against the three file-type forms.
pub fn classify_type(type_text: &str) -> Option<TypeShape> {
    let text: String = type_text.chars().filter(|c| !c.is_whitespace()).collect();

    if SINGLE_FILE.is_match(&text) {
        return Some(TypeShape::Single);
    }
    if MULTIPLE_FILES.is_match(&text) {
        return Some(TypeShape::Multiple);
    }
    if NAMED_FILES.is_match(&text) {
        let fields = NAMED_FIELD
            .captures_iter(&text)
            .map(|caps| {
                let ty = &caps[2];
                FileFieldInfo {
                    name: caps[1].to_string(),
                    is_array: ty.ends_with("[]") || ty.starts_with("Array<"),
                    max_count: None,
                }
            })
            .collect();
        return Some(TypeShape::Named(fields));
    }
    None
}

/// Which interceptor factory configured the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorKind {
    File,
    Files,
    FileFields,
    AnyFiles,
}

/// Literal configuration read from `@UseInterceptors(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorConfig {
    pub kind: InterceptorKind,
    pub fields: Vec<FileFieldInfo>,
}

/// Find an upload interceptor inside the argument tokens of `@UseInterceptors`.
pub fn parse_interceptor(args: &[Token]) -> Option<InterceptorConfig> {
    let (idx, kind) = args.iter().enumerate().find_map(|(i, t)| {
        let kind = match t.ident()? {
            "FileInterceptor" => InterceptorKind::File,
            "FilesInterceptor" => InterceptorKind::Files,
            "FileFieldsInterceptor" => InterceptorKind::FileFields,
            "AnyFilesInterceptor" => InterceptorKind::AnyFiles,
            _ => return None,
        };
        Some((i, kind))
    })?;

    let inner = balanced_group(&args[idx + 1..])?;

    let fields = match kind {
        InterceptorKind::File => first_string(inner)
            .map(|name| {
                vec![FileFieldInfo {
                    name,
                    is_array: false,
                    max_count: None,
                }]
            })
            .unwrap_or_default(),
        InterceptorKind::Files => {
            let name = first_string(inner);
            let max_count = top_level_args(inner)
                .get(1)
                .and_then(|arg| arg.first())
                .and_then(number_value);
            name.map(|name| {
                vec![FileFieldInfo {
                    name,
                    is_array: true,
                    max_count,
                }]
            })
            .unwrap_or_default()
        }
        InterceptorKind::FileFields => object_literals(inner)
            .into_iter()
            .filter_map(|obj| {
                let name = property(obj, "name").and_then(|t| t.string().map(str::to_string))?;
                let max_count = property(obj, "maxCount").and_then(number_value);
                Some(FileFieldInfo {
                    name,
                    is_array: true,
                    max_count,
                })
            })
            .collect(),
        InterceptorKind::AnyFiles => Vec::new(),
    };

    Some(InterceptorConfig { kind, fields })
}

/// Build the upload spec for one file parameter.
///
/// Returns the spec and the per-binding field info (absent for named multiple).
pub fn infer_upload(
    member: &str,
    type_text: Option<&str>,
    plural_decorator: bool,
    decorator_key: Option<&str>,
    param_name: &str,
    interceptor: Option<&InterceptorConfig>,
) -> (FileUploadSpec, Option<FileFieldInfo>) {
    let type_shape = type_text.and_then(classify_type);

    let shape = match (&type_shape, interceptor.map(|i| i.kind)) {
        (Some(TypeShape::Single), _) => UploadShape::Single,
        (Some(TypeShape::Multiple), _) => UploadShape::Multiple,
        (Some(TypeShape::Named(_)), _) => UploadShape::NamedMultiple,
        (None, Some(InterceptorKind::File)) => UploadShape::Single,
        (None, Some(InterceptorKind::Files | InterceptorKind::AnyFiles)) => UploadShape::Multiple,
        (None, Some(InterceptorKind::FileFields)) => UploadShape::NamedMultiple,
        (None, None) if plural_decorator => UploadShape::Multiple,
        (None, None) => UploadShape::Single,
    };

    let declared = interceptor.map(|i| i.fields.as_slice()).unwrap_or_default();

    if shape == UploadShape::NamedMultiple {
        let mut fields = match type_shape {
            Some(TypeShape::Named(fields)) => fields,
            _ => Vec::new(),
        };
        for field in fields.iter_mut() {
            match declared.iter().find(|d| d.name == field.name) {
                Some(d) => field.max_count = d.max_count,
                None if interceptor.is_some() => tracing::warn!(
                    member = %member,
                    field = %field.name,
                    "Upload field missing from interceptor configuration"
                ),
                None => {}
            }
        }
        for d in declared {
            if !fields.iter().any(|f| f.name == d.name) {
                fields.push(d.clone());
            }
        }
        return (
            FileUploadSpec {
                shape,
                fields,
            },
            None,
        );
    }

    let is_array = shape == UploadShape::Multiple;
    let interceptor_field = declared.first();
    if let (Some(field), Some(key)) = (interceptor_field, decorator_key) {
        if field.name != key {
            tracing::warn!(
                member = %member,
                interceptor_field = %field.name,
                decorator_key = %key,
                "Upload field name differs between interceptor and decorator"
            );
        }
    }

    let name = interceptor_field
        .map(|f| f.name.clone())
        .or_else(|| decorator_key.map(str::to_string))
        .unwrap_or_else(|| param_name.to_string());

    let info = FileFieldInfo {
        name,
        is_array,
        max_count: interceptor_field.and_then(|f| f.max_count),
    };

    (
        FileUploadSpec {
            shape,
            fields: vec![info.clone()],
        },
        Some(info),
    )
}

/// Tokens strictly inside the parenthesized/bracketed group that starts at `tokens[0]`.
pub(crate) fn balanced_group(tokens: &[Token]) -> Option<&[Token]> {
    let open = tokens.first()?;
    let close = match open.kind {
        TokenKind::Punct('(') => ')',
        TokenKind::Punct('[') => ']',
        TokenKind::Punct('{') => '}',
        _ => return None,
    };
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate() {
        match t.kind {
            TokenKind::Punct('(' | '[' | '{') => depth += 1,
            TokenKind::Punct(c @ (')' | ']' | '}')) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (c == close).then(|| &tokens[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split tokens at top-level commas.
pub(crate) fn top_level_args(tokens: &[Token]) -> Vec<&[Token]> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, t) in tokens.iter().enumerate() {
        match t.kind {
            TokenKind::Punct('(' | '[' | '{' | '<') => depth += 1,
            TokenKind::Punct(')' | ']' | '}' | '>') => depth = depth.saturating_sub(1),
            TokenKind::Punct(',') if depth == 0 => {
                args.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        args.push(&tokens[start..]);
    }
    args
}

fn first_string(tokens: &[Token]) -> Option<String> {
    top_level_args(tokens)
        .first()
        .and_then(|arg| match arg {
            [t] => t.string().map(str::to_string),
            _ => None,
        })
}

fn number_value(token: &Token) -> Option<u32> {
    match &token.kind {
        TokenKind::Number(n) => n.replace('_', "").parse().ok(),
        _ => None,
    }
}

fn object_literals(tokens: &[Token]) -> Vec<&[Token]> {
    let body = match tokens.first() {
        Some(t) if t.is_punct('[') => balanced_group(tokens).unwrap_or_default(),
        _ => tokens,
    };
    top_level_args(body)
        .into_iter()
        .filter_map(balanced_group)
        .collect()
}

/// Value token of `key: value` inside an object literal body.
pub(crate) fn property<'a>(object: &'a [Token], key: &str) -> Option<&'a Token> {
    top_level_args(object).into_iter().find_map(|entry| match entry {
        [k, colon, value, ..] if colon.is_punct(':') && (k.is_ident(key) || k.string() == Some(key)) => {
            Some(value)
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::lexer::tokenize;

    #[test]
    fn test_classify_single_and_multiple() {
        assert_eq!(classify_type("Express.Multer.File"), Some(TypeShape::Single));
        assert_eq!(classify_type("Express.Multer.File[]"), Some(TypeShape::Multiple));
        assert_eq!(classify_type("Array<File>"), Some(TypeShape::Multiple));
        assert_eq!(classify_type("string"), None);
        assert_eq!(classify_type("Profile"), None);
    }

    #[test]
    fn test_classify_named() {
        let shape = classify_type("{ documents?: Express.Multer.File[]; avatar: File }").unwrap();
        assert_eq!(
            shape,
            TypeShape::Named(vec![
                FileFieldInfo {
                    name: "documents".into(),
                    is_array: true,
                    max_count: None
                },
                FileFieldInfo {
                    name: "avatar".into(),
                    is_array: false,
                    max_count: None
                },
            ])
        );
    }

    #[test]
    fn test_named_rejects_non_file_property() {
        assert_eq!(classify_type("{ documents: File[]; title: string }"), None);
    }

    #[test]
    fn test_parse_file_fields_interceptor() {
        let tokens = tokenize(
            "FileFieldsInterceptor([{ name: 'documents', maxCount: 5 }, { name: 'images', maxCount: 2 }])",
        )
        .unwrap();
        let cfg = parse_interceptor(&tokens).unwrap();
        assert_eq!(cfg.kind, InterceptorKind::FileFields);
        assert_eq!(cfg.fields.len(), 2);
        assert_eq!(cfg.fields[0].name, "documents");
        assert_eq!(cfg.fields[0].max_count, Some(5));
        assert_eq!(cfg.fields[1].max_count, Some(2));
    }

    #[test]
    fn test_parse_files_interceptor() {
        let tokens = tokenize("FilesInterceptor('photos', 10, { limits: {} })").unwrap();
        let cfg = parse_interceptor(&tokens).unwrap();
        assert_eq!(cfg.kind, InterceptorKind::Files);
        assert_eq!(cfg.fields[0].name, "photos");
        assert_eq!(cfg.fields[0].max_count, Some(10));
    }

    #[test]
    fn test_infer_named_merges_counts() {
        let tokens =
            tokenize("FileFieldsInterceptor([{ name: 'documents', maxCount: 3 }, { name: 'extra' }])")
                .unwrap();
        let cfg = parse_interceptor(&tokens).unwrap();
        let (spec, info) = infer_upload(
            "Docs.upload",
            Some("{documents?:Express.Multer.File[];images?:Express.Multer.File[]}"),
            true,
            None,
            "files",
            Some(&cfg),
        );
        assert!(info.is_none());
        assert_eq!(spec.shape, UploadShape::NamedMultiple);
        let names: Vec<_> = spec.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["documents", "images", "extra"]);
        assert_eq!(spec.field("documents").unwrap().max_count, Some(3));
        assert_eq!(spec.field("images").unwrap().max_count, None);
    }

    #[test]
    fn test_infer_single_uses_interceptor_name() {
        let tokens = tokenize("FileInterceptor('avatar')").unwrap();
        let cfg = parse_interceptor(&tokens).unwrap();
        let (spec, info) = infer_upload(
            "Users.avatar",
            Some("Express.Multer.File"),
            false,
            None,
            "file",
            Some(&cfg),
        );
        assert_eq!(spec.shape, UploadShape::Single);
        assert_eq!(info.unwrap().name, "avatar");
    }

    #[test]
    fn test_infer_falls_back_to_param_name() {
        let (spec, info) = infer_upload("A.b", Some("Buffer"), true, None, "attachments", None);
        assert_eq!(spec.shape, UploadShape::Multiple);
        let info = info.unwrap();
        assert_eq!(info.name, "attachments");
        assert!(info.is_array);
    }
}
