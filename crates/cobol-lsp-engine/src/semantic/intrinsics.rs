//! Intrinsic function catalogue.
//!
//! Every `FUNCTION name` reference is checked against this table: a known
//! name must be called with an argument count inside its arity.

/// Category of an intrinsic function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCategory {
    /// Character and string handling.
    String,
    /// Arithmetic, statistics and finance.
    Numeric,
    /// Dates and times.
    DateTime,
    /// Everything else.
    General,
}

/// Class of the value a function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionResultType {
    Alphanumeric,
    National,
    Numeric,
    Integer,
}

/// One intrinsic function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicFunction {
    /// Upper-case name.
    pub name: &'static str,
    pub category: FunctionCategory,
    pub result_type: FunctionResultType,
    /// Fewest arguments accepted.
    pub min_args: usize,
    /// Most arguments accepted; `None` for variadic functions.
    pub max_args: Option<usize>,
}

impl IntrinsicFunction {
    /// Whether a call with `count` arguments is valid.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Human-readable arity, e.g. `1`, `1 to 2` or `at least 3`.
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

const UNBOUNDED: usize = usize::MAX;

const fn intrinsic(
    name: &'static str,
    category: FunctionCategory,
    result_type: FunctionResultType,
    min_args: usize,
    max_args: usize,
) -> IntrinsicFunction {
    IntrinsicFunction {
        name,
        category,
        result_type,
        min_args,
        max_args: if max_args == UNBOUNDED {
            None
        } else {
            Some(max_args)
        },
    }
}

use FunctionCategory as C;
use FunctionResultType as R;

/// All known intrinsic functions.
pub static INTRINSIC_FUNCTIONS: &[IntrinsicFunction] = &[
    intrinsic("TRIM", C::String, R::Alphanumeric, 1, 2),
    intrinsic("SUBSTITUTE", C::String, R::Alphanumeric, 3, UNBOUNDED),
    intrinsic("CONCATENATE", C::String, R::Alphanumeric, 1, UNBOUNDED),
    intrinsic("LENGTH", C::String, R::Integer, 1, 1),
    intrinsic("REVERSE", C::String, R::Alphanumeric, 1, 1),
    intrinsic("UPPER-CASE", C::String, R::Alphanumeric, 1, 1),
    intrinsic("LOWER-CASE", C::String, R::Alphanumeric, 1, 1),
    intrinsic("DISPLAY-OF", C::String, R::Alphanumeric, 1, 2),
    intrinsic("NATIONAL-OF", C::String, R::National, 1, 2),
    intrinsic("E", C::Numeric, R::Numeric, 0, 0),
    intrinsic("PI", C::Numeric, R::Numeric, 0, 0),
    intrinsic("EXP", C::Numeric, R::Numeric, 1, 1),
    intrinsic("EXP10", C::Numeric, R::Numeric, 1, 1),
    intrinsic("LOG", C::Numeric, R::Numeric, 1, 1),
    intrinsic("LOG10", C::Numeric, R::Numeric, 1, 1),
    intrinsic("SQRT", C::Numeric, R::Numeric, 1, 1),
    intrinsic("ABS", C::Numeric, R::Numeric, 1, 1),
    intrinsic("SIN", C::Numeric, R::Numeric, 1, 1),
    intrinsic("COS", C::Numeric, R::Numeric, 1, 1),
    intrinsic("TAN", C::Numeric, R::Numeric, 1, 1),
    intrinsic("MIN", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("MAX", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("SUM", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("MEAN", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("MEDIAN", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("VARIANCE", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("STANDARD-DEVIATION", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("MOD", C::Numeric, R::Integer, 2, 2),
    intrinsic("REM", C::Numeric, R::Numeric, 2, 2),
    intrinsic("INTEGER", C::Numeric, R::Integer, 1, 1),
    intrinsic("INTEGER-PART", C::Numeric, R::Integer, 1, 1),
    intrinsic("ACOS", C::Numeric, R::Numeric, 1, 1),
    intrinsic("ASIN", C::Numeric, R::Numeric, 1, 1),
    intrinsic("ATAN", C::Numeric, R::Numeric, 1, 1),
    intrinsic("SIGN", C::Numeric, R::Integer, 1, 1),
    intrinsic("FACTORIAL", C::Numeric, R::Integer, 1, 1),
    intrinsic("RANDOM", C::Numeric, R::Numeric, 0, 1),
    intrinsic("ORD-MIN", C::Numeric, R::Integer, 1, UNBOUNDED),
    intrinsic("ORD-MAX", C::Numeric, R::Integer, 1, UNBOUNDED),
    intrinsic("RANGE", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("MIDRANGE", C::Numeric, R::Numeric, 1, UNBOUNDED),
    intrinsic("ANNUITY", C::Numeric, R::Numeric, 2, 2),
    intrinsic("PRESENT-VALUE", C::Numeric, R::Numeric, 2, UNBOUNDED),
    intrinsic("BYTE-LENGTH", C::String, R::Integer, 1, 1),
    intrinsic("CHAR", C::String, R::Alphanumeric, 1, 1),
    intrinsic("ORD", C::String, R::Integer, 1, 1),
    intrinsic("NUMVAL", C::String, R::Numeric, 1, 1),
    intrinsic("NUMVAL-C", C::String, R::Numeric, 1, 2),
    intrinsic("NUMVAL-F", C::String, R::Numeric, 1, 1),
    intrinsic("TEST-NUMVAL", C::String, R::Integer, 1, 1),
    intrinsic("TEST-NUMVAL-C", C::String, R::Integer, 1, 2),
    intrinsic("TEST-NUMVAL-F", C::String, R::Integer, 1, 1),
    intrinsic("HEX-OF", C::String, R::Alphanumeric, 1, 1),
    intrinsic("HEX-TO-CHAR", C::String, R::Alphanumeric, 1, 1),
    intrinsic("BIT-OF", C::String, R::Alphanumeric, 1, 1),
    intrinsic("BIT-TO-CHAR", C::String, R::Alphanumeric, 1, 1),
    intrinsic("UUID4", C::General, R::Alphanumeric, 0, 0),
    intrinsic("CONTENT-OF", C::General, R::Alphanumeric, 1, 2),
    intrinsic("CURRENT-DATE", C::DateTime, R::Alphanumeric, 0, 0),
    intrinsic("WHEN-COMPILED", C::DateTime, R::Alphanumeric, 0, 0),
    intrinsic("DATE-OF-INTEGER", C::DateTime, R::Integer, 1, 1),
    intrinsic("INTEGER-OF-DATE", C::DateTime, R::Integer, 1, 1),
    intrinsic("DAY-OF-INTEGER", C::DateTime, R::Integer, 1, 1),
    intrinsic("INTEGER-OF-DAY", C::DateTime, R::Integer, 1, 1),
    intrinsic("DATE-TO-YYYYMMDD", C::DateTime, R::Integer, 2, 3),
    intrinsic("YEAR-TO-YYYY", C::DateTime, R::Integer, 2, 3),
    intrinsic("DAY-TO-YYYYDDD", C::DateTime, R::Integer, 2, 3),
    intrinsic("COMBINED-DATETIME", C::DateTime, R::Numeric, 2, 2),
    intrinsic("SECONDS-PAST-MIDNIGHT", C::DateTime, R::Numeric, 0, 0),
    intrinsic("TEST-DATE-YYYYMMDD", C::DateTime, R::Integer, 1, 1),
    intrinsic("TEST-DAY-YYYYDDD", C::DateTime, R::Integer, 1, 1),
];

/// Look up an intrinsic function by name, ignoring case.
pub fn lookup_function(name: &str) -> Option<&'static IntrinsicFunction> {
    INTRINSIC_FUNCTIONS
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

/// Whether `name` is an intrinsic function.
pub fn is_intrinsic_function(name: &str) -> bool {
    lookup_function(name).is_some()
}
