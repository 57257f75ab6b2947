//! The `ColumnType` tagged union and its logical-type tag.
//!
//! This is the cell-value model described in `spec.md` §3: every generated
//! value, whether it came from the random generator, the order generator or
//! the scripted-expression generator, is normalized into a [`ColumnType`]
//! before it is written into a [`crate::pool::TableBlock`].

use std::fmt;

/// Logical schema type for a column or tag, independent of the value
/// currently stored in a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnTypeTag {
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    UTinyInt,
    USmallInt,
    UInt,
    UBigInt,
    Float,
    Double,
    Decimal,
    NChar,
    Varchar,
    Binary,
    Json,
    VarBinary,
    Geometry,
}

impl fmt::Display for ColumnTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnTypeTag::Bool => "bool",
            ColumnTypeTag::TinyInt => "tinyint",
            ColumnTypeTag::SmallInt => "smallint",
            ColumnTypeTag::Int => "int",
            ColumnTypeTag::BigInt => "bigint",
            ColumnTypeTag::UTinyInt => "tinyint_unsigned",
            ColumnTypeTag::USmallInt => "smallint_unsigned",
            ColumnTypeTag::UInt => "int_unsigned",
            ColumnTypeTag::UBigInt => "bigint_unsigned",
            ColumnTypeTag::Float => "float",
            ColumnTypeTag::Double => "double",
            ColumnTypeTag::Decimal => "decimal",
            ColumnTypeTag::NChar => "nchar",
            ColumnTypeTag::Varchar => "varchar",
            ColumnTypeTag::Binary => "binary",
            ColumnTypeTag::Json => "json",
            ColumnTypeTag::VarBinary => "varbinary",
            ColumnTypeTag::Geometry => "geometry",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ColumnTypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" => Ok(ColumnTypeTag::Bool),
            "tinyint" => Ok(ColumnTypeTag::TinyInt),
            "smallint" => Ok(ColumnTypeTag::SmallInt),
            "int" | "integer" => Ok(ColumnTypeTag::Int),
            "bigint" => Ok(ColumnTypeTag::BigInt),
            "tinyint_unsigned" | "utinyint" => Ok(ColumnTypeTag::UTinyInt),
            "smallint_unsigned" | "usmallint" => Ok(ColumnTypeTag::USmallInt),
            "int_unsigned" | "uint" => Ok(ColumnTypeTag::UInt),
            "bigint_unsigned" | "ubigint" => Ok(ColumnTypeTag::UBigInt),
            "float" => Ok(ColumnTypeTag::Float),
            "double" => Ok(ColumnTypeTag::Double),
            "decimal" => Ok(ColumnTypeTag::Decimal),
            "nchar" => Ok(ColumnTypeTag::NChar),
            "varchar" | "binary_varchar" => Ok(ColumnTypeTag::Varchar),
            "binary" => Ok(ColumnTypeTag::Binary),
            "json" => Ok(ColumnTypeTag::Json),
            "varbinary" => Ok(ColumnTypeTag::VarBinary),
            "geometry" => Ok(ColumnTypeTag::Geometry),
            other => Err(format!("unknown column type tag '{other}'")),
        }
    }
}

/// `true` if values of this type are stored in the variable-width arena of a
/// `TableBlock::Column` rather than in a fixed-width buffer.
pub fn is_var_length(tag: ColumnTypeTag) -> bool {
    matches!(
        tag,
        ColumnTypeTag::Decimal
            | ColumnTypeTag::NChar
            | ColumnTypeTag::Varchar
            | ColumnTypeTag::Binary
            | ColumnTypeTag::Json
            | ColumnTypeTag::VarBinary
            | ColumnTypeTag::Geometry
    )
}

/// Byte width of one element for fixed-width types, `None` for variable-width
/// types (the caller must consult a per-column configured max length
/// instead).
pub fn fixed_size(tag: ColumnTypeTag) -> Option<usize> {
    match tag {
        ColumnTypeTag::Bool | ColumnTypeTag::TinyInt | ColumnTypeTag::UTinyInt => Some(1),
        ColumnTypeTag::SmallInt | ColumnTypeTag::USmallInt => Some(2),
        ColumnTypeTag::Int | ColumnTypeTag::UInt | ColumnTypeTag::Float => Some(4),
        ColumnTypeTag::BigInt | ColumnTypeTag::UBigInt | ColumnTypeTag::Double => Some(8),
        ColumnTypeTag::Decimal
        | ColumnTypeTag::NChar
        | ColumnTypeTag::Varchar
        | ColumnTypeTag::Binary
        | ColumnTypeTag::Json
        | ColumnTypeTag::VarBinary
        | ColumnTypeTag::Geometry => None,
    }
}

/// A single cell value, tagged by variant. `Null` carries the tag it would
/// have held so formatters can still look up a column's logical type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Null(ColumnTypeTag),
    Bool(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    UTinyInt(u8),
    USmallInt(u16),
    UInt(u32),
    UBigInt(u64),
    Float(f32),
    Double(f64),
    /// String-backed decimal, preserving the literal textual precision.
    Decimal(String),
    /// UTF-16 code units, as `nchar` is stored natively.
    NChar(Vec<u16>),
    Varchar(String),
    Binary(Vec<u8>),
    Json(String),
    VarBinary(Vec<u8>),
    /// WKT-encoded geometry text.
    Geometry(String),
}

impl ColumnType {
    pub fn tag(&self) -> ColumnTypeTag {
        match self {
            ColumnType::Null(tag) => *tag,
            ColumnType::Bool(_) => ColumnTypeTag::Bool,
            ColumnType::TinyInt(_) => ColumnTypeTag::TinyInt,
            ColumnType::SmallInt(_) => ColumnTypeTag::SmallInt,
            ColumnType::Int(_) => ColumnTypeTag::Int,
            ColumnType::BigInt(_) => ColumnTypeTag::BigInt,
            ColumnType::UTinyInt(_) => ColumnTypeTag::UTinyInt,
            ColumnType::USmallInt(_) => ColumnTypeTag::USmallInt,
            ColumnType::UInt(_) => ColumnTypeTag::UInt,
            ColumnType::UBigInt(_) => ColumnTypeTag::UBigInt,
            ColumnType::Float(_) => ColumnTypeTag::Float,
            ColumnType::Double(_) => ColumnTypeTag::Double,
            ColumnType::Decimal(_) => ColumnTypeTag::Decimal,
            ColumnType::NChar(_) => ColumnTypeTag::NChar,
            ColumnType::Varchar(_) => ColumnTypeTag::Varchar,
            ColumnType::Binary(_) => ColumnTypeTag::Binary,
            ColumnType::Json(_) => ColumnTypeTag::Json,
            ColumnType::VarBinary(_) => ColumnTypeTag::VarBinary,
            ColumnType::Geometry(_) => ColumnTypeTag::Geometry,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnType::Null(_))
    }

    /// Render the cell the way the SQL formatter needs it: strings quoted,
    /// booleans as `true`/`false`, floats with up to 7 significant digits.
    pub fn to_sql_literal(&self) -> String {
        match self {
            ColumnType::Null(_) => "NULL".to_string(),
            ColumnType::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            ColumnType::TinyInt(v) => v.to_string(),
            ColumnType::SmallInt(v) => v.to_string(),
            ColumnType::Int(v) => v.to_string(),
            ColumnType::BigInt(v) => v.to_string(),
            ColumnType::UTinyInt(v) => v.to_string(),
            ColumnType::USmallInt(v) => v.to_string(),
            ColumnType::UInt(v) => v.to_string(),
            ColumnType::UBigInt(v) => v.to_string(),
            ColumnType::Float(v) => format_significant(*v as f64, 7),
            ColumnType::Double(v) => format_significant(*v, 7),
            ColumnType::Decimal(s) => escape_sql_string(s),
            ColumnType::NChar(units) => escape_sql_string(&String::from_utf16_lossy(units)),
            ColumnType::Varchar(s) => escape_sql_string(s),
            ColumnType::Binary(b) => escape_sql_string(&String::from_utf8_lossy(b)),
            ColumnType::Json(s) => escape_sql_string(s),
            ColumnType::VarBinary(b) => escape_sql_string(&String::from_utf8_lossy(b)),
            ColumnType::Geometry(s) => escape_sql_string(s),
        }
    }

    /// Stringify the cell for topic/key pattern interpolation and Influx
    /// line tag/field rendering. Never fails; callers that need to
    /// distinguish "couldn't stringify" wrap this instead.
    pub fn to_display_string(&self) -> String {
        match self {
            ColumnType::Null(_) => String::new(),
            ColumnType::Bool(b) => b.to_string(),
            ColumnType::TinyInt(v) => v.to_string(),
            ColumnType::SmallInt(v) => v.to_string(),
            ColumnType::Int(v) => v.to_string(),
            ColumnType::BigInt(v) => v.to_string(),
            ColumnType::UTinyInt(v) => v.to_string(),
            ColumnType::USmallInt(v) => v.to_string(),
            ColumnType::UInt(v) => v.to_string(),
            ColumnType::UBigInt(v) => v.to_string(),
            ColumnType::Float(v) => v.to_string(),
            ColumnType::Double(v) => v.to_string(),
            ColumnType::Decimal(s) => s.clone(),
            ColumnType::NChar(units) => String::from_utf16_lossy(units),
            ColumnType::Varchar(s) => s.clone(),
            ColumnType::Binary(b) => String::from_utf8_lossy(b).into_owned(),
            ColumnType::Json(s) => s.clone(),
            ColumnType::VarBinary(b) => String::from_utf8_lossy(b).into_owned(),
            ColumnType::Geometry(s) => s.clone(),
        }
    }

    /// `true` for the variants that must be quoted in Influx line protocol
    /// (anything textual); numeric/bool fields are never quoted.
    pub fn is_textual(&self) -> bool {
        matches!(
            self.tag(),
            ColumnTypeTag::Decimal
                | ColumnTypeTag::NChar
                | ColumnTypeTag::Varchar
                | ColumnTypeTag::Binary
                | ColumnTypeTag::Json
                | ColumnTypeTag::VarBinary
                | ColumnTypeTag::Geometry
        )
    }

    /// `true` for types that get an `i` integer suffix in Influx line
    /// protocol fields.
    pub fn is_integer(&self) -> bool {
        matches!(
            self.tag(),
            ColumnTypeTag::TinyInt
                | ColumnTypeTag::SmallInt
                | ColumnTypeTag::Int
                | ColumnTypeTag::BigInt
                | ColumnTypeTag::UTinyInt
                | ColumnTypeTag::USmallInt
                | ColumnTypeTag::UInt
                | ColumnTypeTag::UBigInt
        )
    }
}

fn escape_sql_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Format with up to `sig_digits` significant digits, trimming trailing
/// zeros the way the teacher's `Display` impls keep output compact.
fn format_significant(v: f64, sig_digits: usize) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let magnitude = v.abs().log10().floor() as i32;
    let decimals = (sig_digits as i32 - 1 - magnitude).max(0) as usize;
    let s = format!("{v:.decimals$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0');
        let trimmed = trimmed.trim_end_matches('.');
        trimmed.to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_var_length_matches_fixed_size() {
        for tag in [
            ColumnTypeTag::Bool,
            ColumnTypeTag::Int,
            ColumnTypeTag::BigInt,
            ColumnTypeTag::Float,
            ColumnTypeTag::Double,
        ] {
            assert!(!is_var_length(tag));
            assert!(fixed_size(tag).is_some());
        }
        for tag in [
            ColumnTypeTag::Varchar,
            ColumnTypeTag::NChar,
            ColumnTypeTag::Json,
            ColumnTypeTag::Geometry,
        ] {
            assert!(is_var_length(tag));
            assert!(fixed_size(tag).is_none());
        }
    }

    #[test]
    fn sql_literal_quotes_strings_and_escapes() {
        let cell = ColumnType::Varchar("o'clock".to_string());
        assert_eq!(cell.to_sql_literal(), "'o''clock'");
    }

    #[test]
    fn sql_literal_renders_bool_and_float() {
        assert_eq!(ColumnType::Bool(true).to_sql_literal(), "true");
        assert_eq!(ColumnType::Double(3.14).to_sql_literal(), "3.14");
    }

    #[test]
    fn from_str_round_trips_display() {
        for tag in [ColumnTypeTag::Int, ColumnTypeTag::NChar, ColumnTypeTag::Geometry] {
            let s = tag.to_string();
            let parsed: ColumnTypeTag = s.parse().unwrap();
            assert_eq!(parsed, tag);
        }
    }
}
