//! Declaration parser: annotated classes to descriptors.
//!
//! # Responsibilities
//! - Find classes carrying `@Controller` or `@WebSocketGateway`
//! - Read the path prefix from the class decorator
//! - For each method, take the first verb decorator and its path literal
//! - For each parameter, take the first binding decorator
//! - Hand file parameters to the upload inference
//!
//! # Design Decisions
//! - Works on tokens, never on live reflection
//! - Method bodies and property initializers are skipped as balanced groups
//! - A member with an unsupported decorator shape is dropped and reported;
//!   the rest of the class and file is still extracted

use crate::contract::{BindingKind, ReturnShape, Verb};
use crate::descriptor::lexer::{tokenize, Token, TokenKind};
use crate::descriptor::types::{
    DescriptorError, Extraction, MethodDescriptor, ParamDescriptor, ServiceDescriptor, ServiceKind,
};
use crate::descriptor::upload::{
    balanced_group, infer_upload, parse_interceptor, property, top_level_args, InterceptorConfig,
};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "async", "readonly", "abstract", "override",
    "declare",
];

/// A decorator as written: name plus raw argument tokens.
#[derive(Debug, Clone)]
struct Decorator<'a> {
    name: &'a str,
    args: Option<&'a [Token]>,
    line: usize,
}

impl<'a> Decorator<'a> {
    /// Argument tokens split at top-level commas.
    fn arguments(&self) -> Vec<&'a [Token]> {
        self.args.map(top_level_args).unwrap_or_default()
    }

    /// First argument when it is a single string literal.
    fn string_arg(&self) -> Option<&'a str> {
        match self.arguments().first().copied() {
            Some([t]) => t.string(),
            _ => None,
        }
    }
}

/// Map a parameter decorator name to its binding kind.
pub fn binding_kind(decorator: &str) -> Option<BindingKind> {
    match decorator {
        "Param" => Some(BindingKind::Path),
        "Query" => Some(BindingKind::Query),
        "Headers" => Some(BindingKind::Header),
        "Body" | "MessageBody" => Some(BindingKind::Body),
        "UploadedFile" | "UploadedFiles" => Some(BindingKind::File),
        "Req" | "Request" | "Res" | "Response" | "Next" | "Ip" | "Session" | "ConnectedSocket"
        | "HostParam" => Some(BindingKind::RequestContext),
        _ => None,
    }
}

/// Classify a declared return type.
pub fn return_shape(type_text: Option<&str>) -> ReturnShape {
    match type_text {
        Some("void" | "undefined" | "Promise<void>" | "Promise<undefined>" | "Observable<void>") => {
            ReturnShape::Void
        }
        _ => ReturnShape::Value,
    }
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_punct(c))
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(0)
    }

    /// Consume a balanced group starting at the cursor and return its inside.
    fn group(&mut self) -> Option<&'a [Token]> {
        let inner = balanced_group(&self.tokens[self.pos..])?;
        self.pos += inner.len() + 2;
        Some(inner)
    }

    /// Consume a `<...>` generic list.
    fn skip_angle(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.bump() {
            match t.kind {
                TokenKind::Punct('<') => depth += 1,
                TokenKind::Punct('>') => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Parse `@Name(...)` at the cursor.
    fn decorator(&mut self) -> Option<Decorator<'a>> {
        let at = self.bump()?;
        let mut name = self.bump()?.ident()?;
        // `@nest.Get()` keeps the last segment
        while self.at_punct('.') {
            self.bump();
            name = self.bump()?.ident()?;
        }
        let args = if self.at_punct('(') { self.group() } else { None };
        Some(Decorator {
            name,
            args,
            line: at.line,
        })
    }

    fn decorators(&mut self) -> Vec<Decorator<'a>> {
        let mut out = Vec::new();
        while self.at_punct('@') {
            match self.decorator() {
                Some(d) => out.push(d),
                None => break,
            }
        }
        out
    }

    fn skip_modifiers(&mut self) {
        while let Some(t) = self.peek() {
            let Some(word) = t.ident() else { break };
            let next_is_name = self
                .peek_at(1)
                .is_some_and(|n| n.ident().is_some() || n.string().is_some() || n.is_punct('['));
            if (MODIFIERS.contains(&word) || word == "get" || word == "set") && next_is_name {
                self.bump();
            } else {
                break;
            }
        }
        if self.at_punct('*') {
            self.bump();
        }
    }

    /// Skip a property declaration up to its end.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;
        let mut prev_line = self.line();
        let mut prev: Option<&Token> = None;
        while let Some(t) = self.peek() {
            if depth == 0 {
                if t.is_punct(';') {
                    self.bump();
                    return;
                }
                let continues = prev.is_some_and(|p| {
                    matches!(
                        p.kind,
                        TokenKind::Punct('=' | ':' | ',' | '.' | '+' | '-' | '*' | '/' | '|' | '&' | '?' | '(')
                            | TokenKind::Arrow
                    )
                });
                if t.line > prev_line && !continues && (t.ident().is_some() || t.is_punct('@')) {
                    return;
                }
            }
            match t.kind {
                TokenKind::Punct('(' | '[' | '{') => depth += 1,
                TokenKind::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
                _ => {}
            }
            prev_line = t.line;
            prev = Some(t);
            self.bump();
        }
    }

    /// Collect return type tokens after `:` up to the body or `;`.
    fn return_type(&mut self) -> Vec<&'a Token> {
        let mut out = Vec::new();
        if self.at_punct('{') {
            let start = self.pos;
            if self.group().is_some() {
                out.extend(&self.tokens[start..self.pos]);
            }
        }
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            if depth == 0 && (t.is_punct('{') || t.is_punct(';')) {
                break;
            }
            match t.kind {
                TokenKind::Punct('(' | '[' | '<') => depth += 1,
                TokenKind::Punct(')' | ']' | '>') => depth = depth.saturating_sub(1),
                _ => {}
            }
            out.push(t);
            self.bump();
        }
        out
    }
}

fn type_text<'t>(tokens: impl IntoIterator<Item = &'t Token>) -> Option<String> {
    let text: String = tokens.into_iter().map(Token::text).collect();
    (!text.is_empty()).then_some(text)
}

/// Extract every annotated class from one source unit.
pub fn extract_source(source: &str) -> Extraction {
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            return Extraction {
                services: Vec::new(),
                errors: vec![e],
            }
        }
    };

    let mut extraction = Extraction::default();
    let mut cursor = Cursor::new(&tokens);
    let mut pending: Vec<Decorator> = Vec::new();

    while !cursor.done() {
        if cursor.at_punct('@') {
            pending.extend(cursor.decorators());
            continue;
        }

        let Some(token) = cursor.bump() else { break };
        match token.ident() {
            Some("class") => {
                let name = cursor.peek().and_then(Token::ident).unwrap_or("<anonymous>");
                // Skip heritage clauses up to the body
                while !cursor.done() && !cursor.at_punct('{') {
                    if cursor.at_punct('<') {
                        cursor.skip_angle();
                    } else {
                        cursor.bump();
                    }
                }
                let line = cursor.line();
                let Some(body) = cursor.group() else {
                    extraction.errors.push(DescriptorError::Syntax {
                        line,
                        message: format!("class {} has no body", name),
                    });
                    break;
                };
                let decorators = std::mem::take(&mut pending);
                class(name, &decorators, body, &mut extraction);
            }
            Some("export" | "default" | "abstract" | "declare") => {}
            _ => pending.clear(),
        }
    }

    tracing::debug!(
        services = extraction.services.len(),
        methods = extraction.method_count(),
        errors = extraction.errors.len(),
        "Source unit extracted"
    );
    extraction
}

fn class(name: &str, decorators: &[Decorator], body: &[Token], out: &mut Extraction) {
    let kind_and_decorator = decorators.iter().find_map(|d| match d.name {
        "Controller" => Some((ServiceKind::Controller, d)),
        "WebSocketGateway" => Some((ServiceKind::Gateway, d)),
        _ => None,
    });
    let Some((kind, decorator)) = kind_and_decorator else {
        return;
    };

    let prefix = match kind {
        ServiceKind::Controller => match controller_prefix(decorator) {
            Ok(prefix) => prefix,
            Err(()) => {
                out.errors.push(DescriptorError::UnsupportedDecorator {
                    member: name.to_string(),
                    decorator: decorator.name.to_string(),
                    line: decorator.line,
                });
                return;
            }
        },
        ServiceKind::Gateway => None,
    };

    let mut service = ServiceDescriptor {
        name: name.to_string(),
        kind,
        prefix,
        methods: Vec::new(),
    };

    let mut cursor = Cursor::new(body);
    while !cursor.done() {
        let decorators = cursor.decorators();
        cursor.skip_modifiers();

        if cursor.at_punct(';') || cursor.at_punct(',') {
            cursor.bump();
            continue;
        }

        let Some(name_token) = cursor.peek() else { break };
        let member_name = match &name_token.kind {
            TokenKind::Ident(s) | TokenKind::Str(s) => s.clone(),
            _ => {
                cursor.skip_statement();
                // Guarantee progress on stray tokens
                if cursor.peek().is_some_and(|t| std::ptr::eq(t, name_token)) {
                    cursor.bump();
                }
                continue;
            }
        };
        cursor.bump();
        if cursor.at_punct('?') || cursor.at_punct('!') {
            cursor.bump();
        }
        if cursor.at_punct('<') {
            cursor.skip_angle();
        }

        if !cursor.at_punct('(') {
            cursor.skip_statement();
            continue;
        }

        let params = cursor.group().unwrap_or_default();
        let return_tokens = if cursor.at_punct(':') {
            cursor.bump();
            cursor.return_type()
        } else {
            Vec::new()
        };
        if cursor.at_punct('{') {
            cursor.group();
        } else if cursor.at_punct(';') {
            cursor.bump();
        }

        let member = format!("{}.{}", name, member_name);
        match method(
            &member,
            &member_name,
            kind,
            &decorators,
            params,
            type_text(return_tokens),
        ) {
            Ok(Some(m)) => service.methods.push(m),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(member = %member, error = %e, "Skipping member");
                out.errors.push(e);
            }
        }
    }

    out.services.push(service);
}

fn controller_prefix(decorator: &Decorator) -> Result<Option<String>, ()> {
    let args = decorator.arguments();
    match args.first() {
        None => Ok(None),
        Some([t]) if t.string().is_some() => Ok(t.string().map(str::to_string)),
        Some(obj) if obj.first().is_some_and(|t| t.is_punct('{')) => {
            let inner = balanced_group(obj).ok_or(())?;
            match property(inner, "path") {
                None => Ok(None),
                Some(t) => t.string().map(|s| Some(s.to_string())).ok_or(()),
            }
        }
        Some(_) => Err(()),
    }
}

fn verb_path(member: &str, decorator: &Decorator, verb: Verb) -> Result<String, DescriptorError> {
    let args = decorator.arguments();
    match args.first() {
        None if verb != Verb::Event => Ok(String::new()),
        Some([t]) if t.string().is_some() => Ok(t.string().unwrap_or_default().to_string()),
        Some(arg) if arg.first().is_some_and(|t| t.is_punct('[')) => {
            Err(DescriptorError::UnsupportedDecorator {
                member: member.to_string(),
                decorator: decorator.name.to_string(),
                line: decorator.line,
            })
        }
        _ => Err(DescriptorError::NonLiteralArgument {
            member: member.to_string(),
            decorator: decorator.name.to_string(),
            line: decorator.line,
        }),
    }
}

fn method(
    member: &str,
    name: &str,
    kind: ServiceKind,
    decorators: &[Decorator],
    params: &[Token],
    return_type: Option<String>,
) -> Result<Option<MethodDescriptor>, DescriptorError> {
    let verb_decorator = decorators.iter().find_map(|d| {
        let verb = Verb::from_decorator(d.name)?;
        let allowed = match kind {
            ServiceKind::Controller => !verb.is_event(),
            ServiceKind::Gateway => verb.is_event(),
        };
        allowed.then_some((verb, d))
    });
    let Some((verb, decorator)) = verb_decorator else {
        return Ok(None);
    };

    let path = verb_path(member, decorator, verb)?;

    let interceptor: Option<InterceptorConfig> = decorators
        .iter()
        .filter(|d| d.name == "UseInterceptors")
        .find_map(|d| d.args.and_then(parse_interceptor));

    let mut descriptor = MethodDescriptor {
        name: name.to_string(),
        verb,
        path,
        params: Vec::new(),
        upload: None,
        returns: return_shape(return_type.as_deref()),
        return_type,
    };

    for param_tokens in top_level_args(params) {
        let mut cursor = Cursor::new(param_tokens);
        let param_decorators = cursor.decorators();
        cursor.skip_modifiers();
        while cursor.at_punct('.') {
            cursor.bump();
        }
        let param_name = cursor
            .bump()
            .and_then(Token::ident)
            .unwrap_or("arg")
            .to_string();
        if cursor.at_punct('?') {
            cursor.bump();
        }
        let declared_type = if cursor.at_punct(':') {
            cursor.bump();
            let mut depth = 0usize;
            let mut tokens = Vec::new();
            while let Some(t) = cursor.peek() {
                if depth == 0 && t.is_punct('=') {
                    break;
                }
                match t.kind {
                    TokenKind::Punct('(' | '[' | '{' | '<') => depth += 1,
                    TokenKind::Punct(')' | ']' | '}' | '>') => depth = depth.saturating_sub(1),
                    _ => {}
                }
                tokens.push(t);
                cursor.bump();
            }
            type_text(tokens)
        } else {
            None
        };

        // Only the first binding decorator counts
        let binding = param_decorators
            .iter()
            .find_map(|d| binding_kind(d.name).map(|k| (k, d)));

        let mut param = ParamDescriptor {
            name: param_name,
            kind: BindingKind::Ignored,
            key: None,
            type_text: declared_type,
            file_info: None,
        };

        if let Some((kind, d)) = binding {
            param.kind = kind;
            param.key = d.string_arg().map(str::to_string);

            if kind == BindingKind::File {
                let (spec, info) = infer_upload(
                    member,
                    param.type_text.as_deref(),
                    d.name == "UploadedFiles",
                    param.key.as_deref(),
                    &param.name,
                    interceptor.as_ref(),
                );
                param.file_info = info;
                match descriptor.upload.as_mut() {
                    None => descriptor.upload = Some(spec),
                    Some(existing) => {
                        for field in spec.fields {
                            if existing.field(&field.name).is_none() {
                                existing.fields.push(field);
                            }
                        }
                    }
                }
            }
        }

        descriptor.params.push(param);
    }

    Ok(Some(descriptor))
}
