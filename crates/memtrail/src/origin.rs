use std::borrow::Cow;
use std::fmt;

/// Call-site provenance for one allocation: the function, source file and
/// line that requested it.
///
/// The core API always takes an explicit `Origin`; [`origin!`](crate::origin!)
/// captures one automatically at the call site. Fields are growable strings,
/// so arbitrarily long function paths are stored without truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    function: Cow<'static, str>,
    file: Cow<'static, str>,
    line: u32,
}

impl Origin {
    pub fn new(
        function: impl Into<Cow<'static, str>>,
        file: impl Into<Cow<'static, str>>,
        line: u32,
    ) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __function_path {
    () => {{
        fn here() {}
        fn name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = name_of(here);
        name.strip_suffix("::here").unwrap_or(name)
    }};
}

/// Captures an [`Origin`] for the current call site: enclosing function
/// path, `file!()` and `line!()`.
///
/// ```
/// let origin = memtrail::origin!();
/// assert!(origin.file().ends_with(".rs"));
/// ```
#[macro_export]
macro_rules! origin {
    () => {
        $crate::Origin::new($crate::__function_path!(), file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_report_format() {
        let origin = Origin::new("parser::parse_header", "src/parser.rs", 42);
        assert_eq!(origin.to_string(), "parser::parse_header (src/parser.rs:42)");
    }

    #[test]
    fn macro_captures_enclosing_function() {
        let origin = crate::origin!();
        assert!(
            origin.function().ends_with("macro_captures_enclosing_function"),
            "unexpected function path: {}",
            origin.function()
        );
        assert!(origin.file().ends_with("origin.rs"));
        assert!(origin.line() > 0);
    }
}
