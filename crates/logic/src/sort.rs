/// Logical sort (type) of a term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Mathematical integer sort
    Int,
    /// Pointer sort (`NULL` or an address)
    Pointer,
    /// Named datatype (user-defined)
    Datatype(String),
}

impl std::str::FromStr for Sort {
    type Err = String;

    /// Accepts both annotation spellings (`integer`, `datatype seq`) and
    /// Rust-like ones (`i64`, `bool`, `seq`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err("empty sort".to_string()),
            "bool" | "boolean" => Ok(Sort::Bool),
            "int" | "integer" | "i32" | "i64" | "i128" | "u32" | "u64" => Ok(Sort::Int),
            "pointer" | "ptr" => Ok(Sort::Pointer),
            _ => {
                let name = s.strip_prefix("datatype").map(str::trim).unwrap_or(s);
                if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    Err(format!("Unknown sort: {s}"))
                } else {
                    Ok(Sort::Datatype(name.to_string()))
                }
            }
        }
    }
}
