//! Path template compilation.
//!
//! # Responsibilities
//! - Parse a path template (`/users/:id`, `/files/:path*`, `/:lang(en|fr)?`)
//! - Compile it once into an anchored regex honouring `exact`/`strict`/`sensitive`
//! - Extract named and positional parameters from a pathname
//!
//! # Design Decisions
//! - Compiled at route-table construction, never per lookup
//! - Query string and fragment are ignored when matching
//! - Unmatched optional parameters are absent from `params`
//! - `**` is a dedicated catch-all, not a regex
//!
//! Supported tokens:
//!
//! | Token          | Meaning                                   |
//! |----------------|-------------------------------------------|
//! | `:name`        | one segment                               |
//! | `:name?`       | optional segment                          |
//! | `:name+`       | one or more segments                      |
//! | `:name*`       | zero or more segments                     |
//! | `:name(re)`    | segment constrained by `re`               |
//! | `(re)`         | positional parameter constrained by `re`  |
//! | `*`            | positional parameter matching anything    |

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use thiserror::Error;

/// Pattern that matches every pathname.
pub const CATCH_ALL: &str = "**";

const URL_GROUP: &str = "__url";

/// Errors raised while compiling a path template.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A `(` group was never closed.
    #[error("unterminated group in pattern `{0}`")]
    UnterminatedGroup(String),

    /// `:` was not followed by a parameter name.
    #[error("missing parameter name after `:` in pattern `{0}`")]
    MissingName(String),

    /// The same parameter name appears twice.
    #[error("duplicate parameter `{name}` in pattern `{pattern}`")]
    DuplicateName { pattern: String, name: String },

    /// The generated expression was rejected by the regex engine.
    #[error("invalid pattern `{pattern}`: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Matching flags carried by every route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// The pattern must consume the whole pathname.
    pub exact: bool,
    /// A trailing slash is significant.
    pub strict: bool,
    /// Comparison is case-sensitive.
    pub sensitive: bool,
}

/// A parameter declared by a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub name: String,
    pub optional: bool,
    pub repeat: bool,
}

/// Result of testing a single pattern against a pathname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// The portion of the pathname consumed by the pattern.
    pub url: String,
    /// Whether `url` is the whole pathname.
    pub is_exact: bool,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug)]
enum Token {
    Literal(String),
    Param {
        name: String,
        prefix: Option<char>,
        pattern: String,
        optional: bool,
        repeat: bool,
    },
}

/// A compiled path template.
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    options: MatchOptions,
    keys: Vec<Key>,
    /// `None` for the catch-all.
    regex: Option<Regex>,
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPattern")
            .field("source", &self.source)
            .field("options", &self.options)
            .field("keys", &self.keys)
            .finish()
    }
}

impl PathPattern {
    /// Compile a template under the given flags.
    pub fn compile(source: &str, options: MatchOptions) -> Result<Self, PatternError> {
        if source == CATCH_ALL {
            return Ok(Self {
                source: source.to_string(),
                options,
                keys: Vec::new(),
                regex: None,
            });
        }

        let tokens = tokenize(source)?;
        let mut keys: Vec<Key> = Vec::new();
        for token in &tokens {
            if let Token::Param { name, optional, repeat, .. } = token {
                if keys.iter().any(|k| &k.name == name) {
                    return Err(PatternError::DuplicateName {
                        pattern: source.to_string(),
                        name: name.clone(),
                    });
                }
                keys.push(Key {
                    name: name.clone(),
                    optional: *optional,
                    repeat: *repeat,
                });
            }
        }

        let expr = build_expression(&tokens, options);
        let regex = Regex::new(&expr).map_err(|source_err| PatternError::Regex {
            pattern: source.to_string(),
            source: source_err,
        })?;

        Ok(Self {
            source: source.to_string(),
            options,
            keys,
            regex: Some(regex),
        })
    }

    /// The template as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// True for the `**` catch-all.
    pub fn is_catch_all(&self) -> bool {
        self.regex.is_none()
    }

    /// Test `pathname` against this pattern.
    ///
    /// Anything after the first `?` or `#` is ignored.
    pub fn matches(&self, pathname: &str) -> Option<PathMatch> {
        let path = strip_query_and_fragment(pathname);

        let Some(regex) = &self.regex else {
            return Some(PathMatch {
                url: path.to_string(),
                is_exact: true,
                params: BTreeMap::new(),
            });
        };

        let caps = regex.captures(path)?;
        let url = caps
            .name(URL_GROUP)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .to_string();

        if self.options.exact && url != path {
            return None;
        }

        let mut params = BTreeMap::new();
        for (index, key) in self.keys.iter().enumerate() {
            if let Some(value) = caps.name(&param_group(index)) {
                params.insert(key.name.clone(), value.as_str().to_string());
            }
        }

        let is_exact = url == path;
        let url = if self.source == "/" && url.is_empty() {
            "/".to_string()
        } else {
            url
        };

        Some(PathMatch { url, is_exact, params })
    }
}

/// Strip `?query` and `#fragment` from a path.
pub fn strip_query_and_fragment(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}

fn param_group(index: usize) -> String {
    format!("p{index}")
}

fn tokenize(source: &str) -> Result<Vec<Token>, PatternError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut positional = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' && i + 1 < chars.len() {
            literal.push(chars[i + 1]);
            i += 2;
            continue;
        }

        // A `/` or `.` directly before a parameter becomes its prefix.
        let (prefix, start) = match c {
            '/' | '.' if i + 1 < chars.len() && matches!(chars[i + 1], ':' | '(' | '*') => {
                (Some(c), i + 1)
            }
            ':' | '(' | '*' => (None, i),
            _ => {
                literal.push(c);
                i += 1;
                continue;
            }
        };

        let mut j = start;
        let (name, pattern, asterisk) = match chars[j] {
            ':' => {
                j += 1;
                let name_start = j;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                if j == name_start {
                    return Err(PatternError::MissingName(source.to_string()));
                }
                let name: String = chars[name_start..j].iter().collect();
                let pattern = if j < chars.len() && chars[j] == '(' {
                    let (group, next) = read_group(&chars, j, source)?;
                    j = next;
                    Some(group)
                } else {
                    None
                };
                (name, pattern, false)
            }
            '(' => {
                let (group, next) = read_group(&chars, j, source)?;
                j = next;
                let name = positional.to_string();
                positional += 1;
                (name, Some(group), false)
            }
            _ => {
                j += 1;
                let name = positional.to_string();
                positional += 1;
                (name, None, true)
            }
        };

        let (optional, repeat) = if asterisk {
            (false, false)
        } else {
            match chars.get(j) {
                Some('?') => {
                    j += 1;
                    (true, false)
                }
                Some('+') => {
                    j += 1;
                    (false, true)
                }
                Some('*') => {
                    j += 1;
                    (true, true)
                }
                _ => (false, false),
            }
        };

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }

        let delimiter = prefix.unwrap_or('/');
        let pattern = match (pattern, asterisk) {
            (Some(group), _) => escape_group(&group),
            (None, true) => ".*".to_string(),
            (None, false) => format!("[^{}]+?", regex::escape(&delimiter.to_string())),
        };

        tokens.push(Token::Param {
            name,
            prefix,
            pattern,
            optional,
            repeat,
        });
        i = j;
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(tokens)
}

/// Read a `( ... )` group starting at `open`, returning its body and the index after `)`.
fn read_group(chars: &[char], open: usize, source: &str) -> Result<(String, usize), PatternError> {
    let mut body = String::new();
    let mut j = open + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' if j + 1 < chars.len() => {
                body.push('\\');
                body.push(chars[j + 1]);
                j += 2;
            }
            ')' => return Ok((body, j + 1)),
            c => {
                body.push(c);
                j += 1;
            }
        }
    }
    Err(PatternError::UnterminatedGroup(source.to_string()))
}

/// User groups may not introduce captures of their own.
fn escape_group(group: &str) -> String {
    let mut out = String::with_capacity(group.len());
    let mut chars = group.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '(' | ')' | '$' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn build_expression(tokens: &[Token], options: MatchOptions) -> String {
    let mut route = String::new();
    let mut index = 0usize;

    for token in tokens {
        match token {
            Token::Literal(text) => route.push_str(&regex::escape(text)),
            Token::Param { prefix, pattern, optional, repeat, .. } => {
                let prefix = prefix.map(|p| regex::escape(&p.to_string())).unwrap_or_default();
                let mut capture = format!("(?:{pattern})");
                if *repeat {
                    capture = format!("{capture}(?:{prefix}{capture})*");
                }
                let group = param_group(index);
                index += 1;
                if *optional {
                    route.push_str(&format!("(?:{prefix}(?P<{group}>{capture}))?"));
                } else {
                    route.push_str(&format!("{prefix}(?P<{group}>{capture})"));
                }
            }
        }
    }

    let ends_with_delimiter = route.ends_with('/');
    if !options.strict && ends_with_delimiter {
        route.pop();
    }

    let flags = if options.sensitive { "" } else { "(?i)" };
    let body = if options.exact {
        if options.strict {
            format!("(?P<{URL_GROUP}>{route})$")
        } else {
            format!("(?P<{URL_GROUP}>{route}/?)$")
        }
    } else if options.strict && ends_with_delimiter {
        format!("(?P<{URL_GROUP}>{route})")
    } else if options.strict {
        format!("(?P<{URL_GROUP}>{route})(?:/|$)")
    } else {
        format!("(?P<{URL_GROUP}>{route}(?:/$)?)(?:/|$)")
    };

    format!("{flags}^{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> PathPattern {
        PathPattern::compile(source, MatchOptions::default()).unwrap()
    }

    fn exact(source: &str) -> PathPattern {
        PathPattern::compile(
            source,
            MatchOptions {
                exact: true,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_static_prefix_match() {
        let pattern = compile("/users");
        let m = pattern.matches("/users/42").unwrap();
        assert_eq!(m.url, "/users");
        assert!(!m.is_exact);

        assert!(pattern.matches("/usersx").is_none());
        assert!(pattern.matches("/about").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = compile("/");
        let m = pattern.matches("/anything").unwrap();
        assert_eq!(m.url, "/");
        assert!(!m.is_exact);

        let root = exact("/");
        assert!(root.matches("/").unwrap().is_exact);
        assert!(root.matches("/foo").is_none());
    }

    #[test]
    fn test_named_params() {
        let pattern = exact("/users/:id/posts/:post_id");
        let m = pattern.matches("/users/7/posts/99").unwrap();
        assert_eq!(m.params.get("id").map(String::as_str), Some("7"));
        assert_eq!(m.params.get("post_id").map(String::as_str), Some("99"));
    }

    #[test]
    fn test_optional_param_is_absent() {
        let pattern = exact("/docs/:section?");
        let m = pattern.matches("/docs").unwrap();
        assert!(!m.params.contains_key("section"));

        let m = pattern.matches("/docs/intro").unwrap();
        assert_eq!(m.params["section"], "intro");
    }

    #[test]
    fn test_repeat_params() {
        let star = exact("/files/:path*");
        assert!(star.matches("/files").unwrap().params.is_empty());
        assert_eq!(star.matches("/files/a/b/c").unwrap().params["path"], "a/b/c");

        let plus = exact("/files/:path+");
        assert!(plus.matches("/files").is_none());
        assert_eq!(plus.matches("/files/a/b").unwrap().params["path"], "a/b");
    }

    #[test]
    fn test_custom_and_positional_groups() {
        let pattern = exact("/items/:id(\\d+)");
        assert!(pattern.matches("/items/12").is_some());
        assert!(pattern.matches("/items/abc").is_none());

        let positional = exact("/lang/(en|fr)");
        assert_eq!(positional.matches("/lang/fr").unwrap().params["0"], "fr");

        let wildcard = compile("/assets/*");
        assert_eq!(wildcard.matches("/assets/img/logo.png").unwrap().params["0"], "img/logo.png");
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        let pattern = exact("/foo");
        assert!(pattern.matches("/foo?x=1#y").is_some());
        assert!(pattern.matches("/foo#top").is_some());
    }

    #[test]
    fn test_strict_trailing_slash() {
        let lenient = exact("/foo");
        assert!(lenient.matches("/foo/").is_some());

        let strict = PathPattern::compile(
            "/foo",
            MatchOptions {
                exact: true,
                strict: true,
                sensitive: false,
            },
        )
        .unwrap();
        assert!(strict.matches("/foo").is_some());
        assert!(strict.matches("/foo/").is_none());
    }

    #[test]
    fn test_non_strict_trailing_slash_is_exact() {
        let pattern = compile("/foo");
        let m = pattern.matches("/foo/").unwrap();
        assert_eq!(m.url, "/foo/");
        assert!(m.is_exact);
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(exact("/About").matches("/about").is_some());

        let sensitive = PathPattern::compile(
            "/About",
            MatchOptions {
                exact: true,
                strict: false,
                sensitive: true,
            },
        )
        .unwrap();
        assert!(sensitive.matches("/about").is_none());
        assert!(sensitive.matches("/About").is_some());
    }

    #[test]
    fn test_catch_all() {
        let pattern = compile(CATCH_ALL);
        assert!(pattern.is_catch_all());
        let m = pattern.matches("/any/thing?q=1").unwrap();
        assert_eq!(m.url, "/any/thing");
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            PathPattern::compile("/a/:", MatchOptions::default()),
            Err(PatternError::MissingName(_))
        ));
        assert!(matches!(
            PathPattern::compile("/a/(\\d+", MatchOptions::default()),
            Err(PatternError::UnterminatedGroup(_))
        ));
        assert!(matches!(
            PathPattern::compile("/:id/:id", MatchOptions::default()),
            Err(PatternError::DuplicateName { .. })
        ));
    }
}
