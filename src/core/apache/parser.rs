//! Minimal Apache httpd configuration loader.
//!
//! Understands comments, `\` line continuations, directives, nested
//! `<Section arg>` blocks and `Include`/`IncludeOptional` (with globs).
//! Everything else is kept verbatim as scalar text.

use std::fs;
use std::path::{Path, PathBuf};

use super::{ConfigNode, ConfigParser, ParseOptions};
use crate::error::{Error, Result};

const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct ApacheParser;

impl ApacheParser {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigParser for ApacheParser {
    fn parse(&self, path: &Path, options: &ParseOptions) -> Result<ConfigNode> {
        let mut root = ConfigNode::mapping();
        load_into(path, options, &mut root, 0)?;
        Ok(root)
    }
}

struct Section {
    name: String,
    arg: String,
    body: ConfigNode,
    line: usize,
}

fn load_into(path: &Path, options: &ParseOptions, target: &mut ConfigNode, depth: usize) -> Result<()> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::config_parse_failed(
            path.display().to_string(),
            format!("Include nesting deeper than {} levels", MAX_INCLUDE_DEPTH),
            None,
        ));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::config_parse_failed(path.display().to_string(), e.to_string(), None)
    })?;

    let mut stack: Vec<Section> = Vec::new();

    for (line_no, line) in logical_lines(&content) {
        let parse_error =
            |msg: String| Error::config_parse_failed(path.display().to_string(), msg, Some(line_no));

        if let Some(close) = line.strip_prefix("</") {
            let name = close.trim_end_matches('>').trim();
            let section = stack
                .pop()
                .ok_or_else(|| parse_error(format!("Unexpected closing tag </{}>", name)))?;
            if !section.name.eq_ignore_ascii_case(name) {
                return Err(parse_error(format!(
                    "Closing tag </{}> does not match <{}> opened on line {}",
                    name, section.name, section.line
                )));
            }

            let mut wrapper = ConfigNode::mapping();
            wrapper.insert(section.arg, section.body);
            let key = key_name(&section.name, options);
            current(&mut stack, target).insert(key, wrapper);
            continue;
        }

        if let Some(open) = line.strip_prefix('<') {
            let inner = open
                .strip_suffix('>')
                .ok_or_else(|| parse_error(format!("Unterminated section header <{}", open)))?;
            let (name, arg) = split_directive(inner);
            if name.is_empty() {
                return Err(parse_error("Empty section name".to_string()));
            }
            stack.push(Section {
                name: name.to_string(),
                arg: unquote(arg).to_string(),
                body: ConfigNode::mapping(),
                line: line_no,
            });
            continue;
        }

        let (name, value) = split_directive(&line);

        if name.eq_ignore_ascii_case("include") || name.eq_ignore_ascii_case("includeoptional") {
            let optional = name.eq_ignore_ascii_case("includeoptional");
            let files = resolve_include(unquote(value), options, optional)
                .map_err(|msg| parse_error(msg))?;
            for file in files {
                load_into(&file, options, current(&mut stack, target), depth + 1)?;
            }
            continue;
        }

        let key = key_name(name, options);
        current(&mut stack, target).insert(key, ConfigNode::Scalar(unquote(value).to_string()));
    }

    if let Some(open) = stack.last() {
        return Err(Error::config_parse_failed(
            path.display().to_string(),
            format!("Section <{}> is never closed", open.name),
            Some(open.line),
        ));
    }

    Ok(())
}

fn current<'a>(stack: &'a mut [Section], root: &'a mut ConfigNode) -> &'a mut ConfigNode {
    match stack.last_mut() {
        Some(section) => &mut section.body,
        None => root,
    }
}

fn key_name(name: &str, options: &ParseOptions) -> String {
    if options.case_insensitive_keys {
        name.to_lowercase()
    } else {
        name.to_string()
    }
}

/// Joins `\`-continued lines and drops blanks and comments.
/// Yields the 1-based line number where each logical line starts.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    let mut start = 0;

    for (idx, raw) in content.lines().enumerate() {
        if pending.is_empty() {
            start = idx + 1;
        }
        let trimmed = raw.trim();
        if let Some(head) = trimmed.strip_suffix('\\') {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(trimmed);

        let line = std::mem::take(&mut pending);
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            lines.push((start, line.to_string()));
        }
    }

    let line = pending.trim();
    if !line.is_empty() && !line.starts_with('#') {
        lines.push((start, line.to_string()));
    }

    lines
}

fn split_directive(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], line[pos..].trim()),
        None => (line, ""),
    }
}

/// Strips one pair of surrounding double quotes.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn resolve_include(
    pattern: &str,
    options: &ParseOptions,
    optional: bool,
) -> std::result::Result<Vec<PathBuf>, String> {
    if pattern.is_empty() {
        return Err("Include without a path".to_string());
    }

    let mut target = PathBuf::from(pattern);
    if target.is_relative() && options.include_relative {
        target = options.root_dir.join(target);
    }

    let has_wildcard = pattern.contains(['*', '?', '[']);
    let mut files = Vec::new();

    if has_wildcard {
        let pattern = target.to_string_lossy().to_string();
        let entries = glob::glob(&pattern).map_err(|e| format!("Bad Include pattern: {}", e))?;
        for entry in entries.flatten() {
            if entry.is_file() {
                files.push(entry);
            }
        }
        files.sort();
        if files.is_empty() && !optional {
            return Err(format!("No matches for wildcard Include {}", pattern));
        }
        return Ok(files);
    }

    if target.is_dir() {
        let entries = fs::read_dir(&target)
            .map_err(|e| format!("Cannot read Include directory {}: {}", target.display(), e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        return Ok(files);
    }

    if target.is_file() {
        return Ok(vec![target]);
    }

    if optional {
        Ok(Vec::new())
    } else {
        Err(format!("Include file {} does not exist", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apache::extract_document_roots;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn parse(path: &Path) -> Result<ConfigNode> {
        ApacheParser::new().parse(path, &ParseOptions::for_file(path))
    }

    #[test]
    fn parses_virtual_hosts() {
        let dir = TempDir::new().unwrap();
        let conf = write(
            &dir,
            "000-default.conf",
            r#"
# default site
<VirtualHost *:80>
    ServerName example.com
    DocumentRoot "/var/www/example"
    <Directory /var/www/example>
        AllowOverride All
    </Directory>
</VirtualHost>
"#,
        );

        let tree = parse(&conf).unwrap();
        let vhost = tree.get("virtualhost").and_then(|v| v.get("*:80")).unwrap();
        assert_eq!(
            vhost.get("documentroot").and_then(ConfigNode::as_scalar),
            Some("/var/www/example")
        );
        assert!(vhost
            .get("directory")
            .and_then(|d| d.get("/var/www/example"))
            .is_some());
    }

    #[test]
    fn keeps_case_when_asked() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "a.conf", "DocumentRoot /srv/a\n");
        let options = ParseOptions {
            case_insensitive_keys: false,
            ..ParseOptions::for_file(&conf)
        };

        let tree = ApacheParser::new().parse(&conf, &options).unwrap();
        assert!(tree.get("DocumentRoot").is_some());
        assert!(tree.get("documentroot").is_none());
    }

    #[test]
    fn follows_relative_includes_with_globs() {
        let dir = TempDir::new().unwrap();
        write(&dir, "sites-enabled/a.conf", "<VirtualHost *:80>\nDocumentRoot /srv/a\n</VirtualHost>\n");
        write(&dir, "sites-enabled/b.conf", "<VirtualHost *:80>\nDocumentRoot /srv/b\n</VirtualHost>\n");
        let main = write(
            &dir,
            "apache2.conf",
            "ServerRoot /etc/apache2\nIncludeOptional sites-enabled/*.conf\nIncludeOptional conf-enabled/*.conf\n",
        );

        let tree = parse(&main).unwrap();
        let roots: Vec<String> = extract_document_roots(&tree).into_iter().collect();
        assert_eq!(roots, vec!["/srv/a", "/srv/b"]);
    }

    #[test]
    fn missing_mandatory_include_is_an_error() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "apache2.conf", "Include ports.conf\n");

        let err = parse(&main).unwrap_err();
        assert_eq!(err.code.as_str(), "config.parse_failed");
        assert_eq!(err.details["line"], 1);
    }

    #[test]
    fn joins_continuation_lines() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "a.conf", "DocumentRoot \\\n  /srv/continued\n");

        let tree = parse(&conf).unwrap();
        assert_eq!(
            tree.get("documentroot").and_then(ConfigNode::as_scalar),
            Some("/srv/continued")
        );
    }

    #[test]
    fn unbalanced_sections_are_rejected() {
        let dir = TempDir::new().unwrap();
        let unclosed = write(&dir, "unclosed.conf", "<VirtualHost *:80>\nDocumentRoot /srv\n");
        let mismatched = write(&dir, "mismatched.conf", "<VirtualHost *:80>\n</Directory>\n");

        assert!(parse(&unclosed).is_err());
        assert!(parse(&mismatched).is_err());
    }

    #[test]
    fn self_include_hits_depth_limit() {
        let dir = TempDir::new().unwrap();
        let conf = write(&dir, "loop.conf", "Include loop.conf\n");

        let err = parse(&conf).unwrap_err();
        assert!(err.details["error"].as_str().unwrap().contains("nesting"));
    }
}
