//! Built-in commands: `define`, `undefine` and `include`
//!
//! Arguments of built-ins are used raw. Nothing inside them is expanded, so a
//! macro body keeps its escapes until it is invoked.

use super::engine::{Arguments, Run};
use super::error::ExpandError;
use super::frames::{Frame, FrameKind};
use super::macros::{is_reserved, is_valid_name};

/// Name and parameter list parsed from the first argument of `define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineHeader {
    pub name: String,
    pub params: Vec<String>,
}

impl DefineHeader {
    /// Parse `name param...`, separated by whitespace.
    pub fn parse(header: &str) -> Result<Self, ExpandError> {
        let mut words = header.split_whitespace();
        let name = words.next().unwrap_or_default();
        if !is_valid_name(name) || is_reserved(name) {
            return Err(ExpandError::InvalidMacroName(header.trim().to_string()));
        }

        let mut params: Vec<String> = Vec::new();
        for param in words {
            if !is_valid_name(param) || params.iter().any(|p| p == param) {
                return Err(ExpandError::InvalidMacroName(format!("{}: {}", name, param)));
            }
            params.push(param.to_string());
        }

        Ok(Self {
            name: name.to_string(),
            params,
        })
    }
}

impl Run<'_> {
    /// `define{name params...}{body}`
    pub(crate) fn define(&mut self) -> Result<(), ExpandError> {
        let args = self.collect_arguments("define", 2)?;
        let result = if self.check_arity("define", &args, 2) {
            self.define_from(&args)
        } else {
            Ok(())
        };
        self.expansion.truncate(args.mark);
        result
    }

    fn define_from(&mut self, args: &Arguments) -> Result<(), ExpandError> {
        if let Some((index, len)) = args.dropped {
            // an oversized body is reported against the macro buffer when it
            // exceeds that one too
            if index == 1 {
                let header = DefineHeader::parse(&self.expansion.text(args.groups[0].clone()))?;
                let available = self.macros.available_for(&header.name);
                if len > available {
                    return Err(ExpandError::MacroBufferOverflow {
                        name: header.name,
                        requested: len,
                        available,
                    });
                }
            }
            return self.require_stored(args);
        }

        let header = DefineHeader::parse(&self.expansion.text(args.groups[0].clone()))?;
        let body = self.expansion.slice(args.groups[1].clone());
        tracing::debug!(
            name = %header.name,
            arity = header.params.len(),
            len = body.len(),
            "define"
        );
        self.macros.define(&header.name, header.params, body)
    }

    /// `undefine{name}`. Undefining an unknown name is not an error.
    pub(crate) fn undefine(&mut self) -> Result<(), ExpandError> {
        let args = self.collect_arguments("undefine", 1)?;
        self.require_stored(&args)?;
        if self.check_arity("undefine", &args, 1) {
            let name = self.expansion.text(args.groups[0].clone());
            let removed = self.macros.undefine(name.trim());
            tracing::debug!(name = name.trim(), removed, "undefine");
        }
        self.expansion.truncate(args.mark);
        Ok(())
    }

    /// `include{path}`: push the resolved file as a new frame.
    pub(crate) fn include(&mut self) -> Result<(), ExpandError> {
        let args = self.collect_arguments("include", 1)?;
        self.require_stored(&args)?;
        let present = self.check_arity("include", &args, 1);
        let name = present.then(|| self.expansion.text(args.groups[0].clone()));
        self.expansion.truncate(args.mark);
        let Some(name) = name else {
            return Ok(());
        };
        let name = name.trim();

        if self.stack.depth() >= self.max_depth {
            return Err(ExpandError::RecursionLimit {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        let resolved = self.includes.enter(name)?;
        tracing::debug!(name, path = %resolved.path.display(), "entering include");
        self.stack.push(Frame::stream(
            FrameKind::Include {
                path: resolved.path,
            },
            resolved.source,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_without_parameters() {
        let header = DefineHeader::parse("greet").unwrap();
        assert_eq!(header.name, "greet");
        assert!(header.params.is_empty());
    }

    #[test]
    fn test_header_with_parameters() {
        let header = DefineHeader::parse("  pair  first\nsecond ").unwrap();
        assert_eq!(header.name, "pair");
        assert_eq!(header.params, vec!["first", "second"]);
    }

    #[test]
    fn test_header_rejects_bad_names() {
        for bad in ["", "  ", "9lives", "define", "a-b", "x y y", "x 1y"] {
            assert!(
                matches!(DefineHeader::parse(bad), Err(ExpandError::InvalidMacroName(_))),
                "accepted {:?}",
                bad
            );
        }
    }
}
