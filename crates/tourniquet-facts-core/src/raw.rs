//! Raw extractor output.
//!
//! The AST exporter emits one JSON document per translation unit:
//!
//! ```json
//! {
//!   "module_name": "prog.c",
//!   "globals": [["var_type", 20, 1, 20, 14, "pass", "char *", 0, 8]],
//!   "functions": {
//!     "main": [
//!       ["func_decl", 22, 1, 38, 1],
//!       ["var_type", 23, 3, 23, 15, "buff", "char", 1, 10],
//!       ["call_type", 32, 3, 32, 19, "strcpy(buff, pov)", "strcpy", ["buff", "char *"], ["pov", "char *"]],
//!       ["stmt_type", 32, 3, 32, 19, "strcpy(buff, pov)"]
//!     ]
//!   }
//! }
//! ```
//!
//! Every fact is a positional record, tag first, then the start and end
//! coordinates, then tag-specific fields. Integers may arrive as numbers or
//! as numeric strings.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

use crate::SourceSpan;

/// Everything the exporter found in one translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AstFacts {
    pub module_name: String,
    #[serde(default)]
    pub globals: Vec<FactTuple>,
    /// Per-function fact lists, in the order the exporter emitted them.
    #[serde(default, deserialize_with = "ordered_functions")]
    pub functions: Vec<(String, Vec<FactTuple>)>,
}

/// One positional fact record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactTuple {
    FuncDecl {
        span: SourceSpan,
    },
    VarType {
        span: SourceSpan,
        name: String,
        type_name: String,
        is_array: bool,
        size: u64,
    },
    CallType {
        span: SourceSpan,
        expr: String,
        callee: String,
        /// `(argument text, argument type)` pairs.
        arguments: Vec<(String, String)>,
    },
    StmtType {
        span: SourceSpan,
        expr: String,
    },
}

impl FactTuple {
    pub const TAGS: &'static [&'static str] = &["func_decl", "var_type", "call_type", "stmt_type"];

    pub fn tag(&self) -> &'static str {
        match self {
            FactTuple::FuncDecl { .. } => "func_decl",
            FactTuple::VarType { .. } => "var_type",
            FactTuple::CallType { .. } => "call_type",
            FactTuple::StmtType { .. } => "stmt_type",
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            FactTuple::FuncDecl { span }
            | FactTuple::VarType { span, .. }
            | FactTuple::CallType { span, .. }
            | FactTuple::StmtType { span, .. } => *span,
        }
    }
}

/// A loosely typed scalar field; the exporter is not consistent about quoting.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(u64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    fn into_u64<E: de::Error>(self, field: &str) -> Result<u64, E> {
        match self {
            Scalar::Int(n) => Ok(n),
            Scalar::Bool(b) => Ok(u64::from(b)),
            Scalar::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("{field}: expected integer, got {s:?}"))),
        }
    }

    fn into_u32<E: de::Error>(self, field: &str) -> Result<u32, E> {
        let n = self.into_u64::<E>(field)?;
        u32::try_from(n).map_err(|_| E::custom(format!("{field}: {n} out of range")))
    }

    fn into_bool<E: de::Error>(self, field: &str) -> Result<bool, E> {
        match self {
            Scalar::Bool(b) => Ok(b),
            Scalar::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Scalar::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Ok(other.into_u64::<E>(field)? != 0),
        }
    }

    fn into_string(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

fn required<'de, A, T>(seq: &mut A, tag: &str, field: &str) -> Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::custom(format!("{tag} record is missing `{field}`")))
}

impl<'de> Deserialize<'de> for FactTuple {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FactVisitor;

        impl<'de> Visitor<'de> for FactVisitor {
            type Value = FactTuple;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a tagged fact record like [\"stmt_type\", 1, 1, 1, 5, \"x = 1\"]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FactTuple, A::Error> {
                let tag: String = required(&mut seq, "fact", "tag")?;
                if !FactTuple::TAGS.contains(&tag.as_str()) {
                    return Err(de::Error::unknown_variant(&tag, FactTuple::TAGS));
                }

                let mut coord = |field: &str| -> Result<u32, A::Error> {
                    required::<A, Scalar>(&mut seq, &tag, field)?.into_u32(field)
                };
                let span = SourceSpan::new(
                    coord("start_line")?,
                    coord("start_column")?,
                    coord("end_line")?,
                    coord("end_column")?,
                );

                let fact = match tag.as_str() {
                    "func_decl" => FactTuple::FuncDecl { span },
                    "var_type" => FactTuple::VarType {
                        span,
                        name: required::<A, Scalar>(&mut seq, &tag, "name")?.into_string(),
                        type_name: required::<A, Scalar>(&mut seq, &tag, "type")?.into_string(),
                        is_array: required::<A, Scalar>(&mut seq, &tag, "is_array")?
                            .into_bool("is_array")?,
                        size: required::<A, Scalar>(&mut seq, &tag, "size")?.into_u64("size")?,
                    },
                    "call_type" => {
                        let expr = required::<A, Scalar>(&mut seq, &tag, "expr")?.into_string();
                        let callee = required::<A, Scalar>(&mut seq, &tag, "callee")?.into_string();
                        let mut arguments = Vec::new();
                        while let Some(arg) = seq.next_element::<(String, String)>()? {
                            arguments.push(arg);
                        }
                        FactTuple::CallType {
                            span,
                            expr,
                            callee,
                            arguments,
                        }
                    }
                    _ => FactTuple::StmtType {
                        span,
                        expr: required::<A, Scalar>(&mut seq, &tag, "expr")?.into_string(),
                    },
                };

                // Trailing fields are tolerated so newer exporters stay readable.
                while seq.next_element::<de::IgnoredAny>()?.is_some() {}
                Ok(fact)
            }
        }

        deserializer.deserialize_seq(FactVisitor)
    }
}

fn ordered_functions<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<FactTuple>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FunctionsVisitor;

    impl<'de> Visitor<'de> for FunctionsVisitor {
        type Value = Vec<(String, Vec<FactTuple>)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from function name to fact records")
        }

        fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
            let mut functions = Vec::new();
            while let Some((name, facts)) = map.next_entry::<String, Vec<FactTuple>>()? {
                functions.push((name, facts));
            }
            Ok(functions)
        }
    }

    deserializer.deserialize_map(FunctionsVisitor)
}
