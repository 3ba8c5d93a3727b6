//! Stored-procedure calls.
//!
//! Command text is either the ODBC call escape, `{CALL proc(?, ?)}` or
//! `{? = CALL func(?)}`, or a bare procedure name whose arguments are the
//! supplied parameters in order.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DalError;
use crate::params::DbParameter;
use crate::translation::count_placeholders;
use crate::types::ParameterDirection;

static CALL_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*\{\s*(\?\s*=\s*)?call\s+([^\s(}]+)\s*(?:\((.*)\))?\s*\}\s*;?\s*$")
        .expect("call escape pattern is valid")
});

// dotted parts; spaces only inside [brackets] or "quotes"
static BARE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:[A-Za-z_][\w$#]*|\[[^\]]+\]|"[^"]+")(?:\.(?:[A-Za-z_][\w$#]*|\[[^\]]+\]|"[^"]+"))*$"#,
    )
    .expect("procedure name pattern is valid")
});

/// A parsed procedure call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureCall {
    name: String,
    returns: bool,
    /// Argument expressions as written; `None` for a bare name.
    arguments: Option<Vec<String>>,
}

/// One argument of a call after parameters are matched to placeholders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallArgument<'a> {
    /// A `?` placeholder and the parameter bound to it.
    Parameter(&'a DbParameter),
    /// An expression written in the call text.
    Literal(&'a str),
}

/// A call with its parameters assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPlan<'a> {
    pub name: &'a str,
    pub arguments: Vec<CallArgument<'a>>,
    pub return_value: Option<&'a DbParameter>,
}

impl CallPlan<'_> {
    /// Parameters in the order their values are sent: return slot first.
    pub fn parameters(&self) -> impl Iterator<Item = &DbParameter> {
        self.return_value
            .into_iter()
            .chain(self.arguments.iter().filter_map(|a| match a {
                CallArgument::Parameter(p) => Some(*p),
                CallArgument::Literal(_) => None,
            }))
    }

    /// True when nothing has to be read back.
    #[must_use]
    pub fn is_input_only(&self) -> bool {
        self.return_value.is_none() && self.parameters().all(|p| !p.direction().is_output())
    }
}

impl ProcedureCall {
    /// Parse the `{CALL …}` escape; `None` for any other text.
    #[must_use]
    pub fn parse_escape(command_text: &str) -> Option<Self> {
        let caps = CALL_ESCAPE.captures(command_text)?;
        let arguments = caps
            .get(3)
            .map(|m| split_arguments(m.as_str()))
            .unwrap_or_default();
        Some(Self {
            name: caps[2].to_string(),
            returns: caps.get(1).is_some(),
            arguments: Some(arguments),
        })
    }

    /// Parse the escape or accept a bare procedure name.
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] if the text is neither.
    pub fn parse(command_text: &str) -> Result<Self, DalError> {
        if let Some(call) = Self::parse_escape(command_text) {
            return Ok(call);
        }
        let name = command_text.trim();
        if BARE_NAME.is_match(name) {
            return Ok(Self {
                name: name.to_string(),
                returns: false,
                arguments: None,
            });
        }
        Err(DalError::ConfigError(format!(
            "'{command_text}' is not a procedure name or {{CALL name(?)}} escape"
        )))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the escape has a `? =` return slot.
    #[must_use]
    pub fn returns(&self) -> bool {
        self.returns
    }

    /// Match `params` to the call's placeholders.
    ///
    /// At most one parameter may have [`ParameterDirection::ReturnValue`]; it
    /// fills the return slot. The rest fill `?` arguments in order.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] if the counts do not line up.
    pub fn plan<'a>(&'a self, params: &'a [DbParameter]) -> Result<CallPlan<'a>, DalError> {
        let mut return_value = None;
        let mut positional = Vec::with_capacity(params.len());
        for p in params {
            if p.direction() == ParameterDirection::ReturnValue {
                if return_value.replace(p).is_some() {
                    return Err(DalError::ParameterError(format!(
                        "call to {} has more than one ReturnValue parameter",
                        self.name
                    )));
                }
            } else {
                positional.push(p);
            }
        }
        if self.returns && return_value.is_none() {
            return Err(DalError::ParameterError(format!(
                "call to {} has a return slot but no ReturnValue parameter",
                self.name
            )));
        }

        let arguments = match &self.arguments {
            None => positional.into_iter().map(CallArgument::Parameter).collect(),
            Some(written) => {
                let wanted: usize = written.iter().map(|a| count_placeholders(a)).sum();
                if wanted != positional.len() {
                    return Err(DalError::ParameterError(format!(
                        "call to {} has {wanted} placeholders but {} parameters were supplied",
                        self.name,
                        positional.len()
                    )));
                }
                let mut supplied = positional.into_iter();
                let mut arguments = Vec::with_capacity(written.len());
                for arg in written {
                    if arg.trim() == "?" {
                        if let Some(p) = supplied.next() {
                            arguments.push(CallArgument::Parameter(p));
                        }
                    } else if count_placeholders(arg) == 0 {
                        arguments.push(CallArgument::Literal(arg.trim()));
                    } else {
                        return Err(DalError::ParameterError(format!(
                            "call to {}: placeholders must be whole arguments, got '{arg}'",
                            self.name
                        )));
                    }
                }
                arguments
            }
        };

        Ok(CallPlan {
            name: &self.name,
            arguments,
            return_value,
        })
    }
}

/// Split an argument list on top-level commas.
fn split_arguments(list: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0u32;
    let mut quote: Option<char> = None;
    for c in list.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => args.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current);
    }
    args.into_iter().map(|a| a.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DbType, Provider};

    fn param(name: &str, direction: ParameterDirection) -> DbParameter {
        DbParameter::new(Provider::Oracle, name, DbType::Int32, 0, 1, direction).unwrap()
    }

    #[test]
    fn parses_call_escape() {
        let call = ProcedureCall::parse_escape("{CALL pkg.update_totals(?, 'x,y', ?)}").unwrap();
        assert_eq!(call.name(), "pkg.update_totals");
        assert!(!call.returns());
        assert_eq!(
            call.arguments.as_deref(),
            Some(&["?".to_string(), "'x,y'".to_string(), "?".to_string()][..])
        );

        let call = ProcedureCall::parse_escape(" { ? = call f } ").unwrap();
        assert!(call.returns());
        assert_eq!(call.arguments.as_deref(), Some(&[][..]));
        assert!(ProcedureCall::parse_escape("select 1").is_none());
    }

    #[test]
    fn bare_names_take_every_parameter() {
        let call = ProcedureCall::parse("dbo.purge_sessions").unwrap();
        let params = vec![
            param("a", ParameterDirection::Input),
            param("b", ParameterDirection::Output),
        ];
        let plan = call.plan(&params).unwrap();
        assert_eq!(plan.arguments.len(), 2);
        assert!(!plan.is_input_only());
        assert!(ProcedureCall::parse("delete from t").is_err());
    }

    #[test]
    fn bare_names_reject_statements() {
        for name in ["[dbo].[purge old sessions]", "\"HR\".\"Pay Raise\"", "pkg.do$it#2", "_p"] {
            assert!(ProcedureCall::parse(name).is_ok(), "{name}");
        }
        for text in [
            "delete from t",
            "dbo.p; drop table t",
            "exec dbo.p",
            "1abc",
            "dbo..p",
            "[dbo].p x",
        ] {
            let err = ProcedureCall::parse(text).unwrap_err();
            assert!(err.is_config(), "{text}");
        }
    }

    #[test]
    fn return_value_fills_return_slot() {
        let call = ProcedureCall::parse("{? = CALL next_id(?)}").unwrap();
        let params = vec![
            param("seq", ParameterDirection::Input),
            param("rv", ParameterDirection::ReturnValue),
        ];
        let plan = call.plan(&params).unwrap();
        assert_eq!(plan.return_value.map(DbParameter::name), Some("rv"));
        let order: Vec<_> = plan.parameters().map(DbParameter::name).collect();
        assert_eq!(order, ["rv", "seq"]);
    }

    #[test]
    fn placeholder_count_must_match() {
        let call = ProcedureCall::parse("{CALL p(?, ?)}").unwrap();
        let params = vec![param("a", ParameterDirection::Input)];
        assert!(matches!(call.plan(&params), Err(DalError::ParameterError(_))));

        let call = ProcedureCall::parse("{? = CALL f(?)}").unwrap();
        assert!(call.plan(&params).is_err());
    }
}
