use std::fs;

use crate::collectors::SampleError;

const PROC_LOADAVG: &str = "/proc/loadavg";

pub fn read_load_1m() -> Result<f64, SampleError> {
    let contents = fs::read_to_string(PROC_LOADAVG).map_err(SampleError::io(PROC_LOADAVG))?;
    parse_load_1m(&contents)
}

/// First field of `/proc/loadavg`, e.g. `0.42 0.35 0.30 1/523 12345`.
pub fn parse_load_1m(contents: &str) -> Result<f64, SampleError> {
    let field = contents.split_whitespace().next().ok_or(SampleError::Empty("load1"))?;
    let load: f64 = field.parse().map_err(|e| SampleError::Parse {
        path: PROC_LOADAVG,
        detail: format!("{field}: {e}"),
    })?;
    if !load.is_finite() || load < 0.0 {
        return Err(SampleError::Parse {
            path: PROC_LOADAVG,
            detail: format!("load average out of range: {load}"),
        });
    }
    Ok(load)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_load_1m() {
        assert_eq!(parse_load_1m("0.42 0.35 0.30 1/523 12345\n").unwrap(), 0.42);
        assert_eq!(parse_load_1m("12.00 8.10 4.02 9/1024 1\n").unwrap(), 12.0);
    }

    #[test]
    fn test_parse_load_1m_empty() {
        assert!(matches!(parse_load_1m(""), Err(SampleError::Empty("load1"))));
        assert!(matches!(parse_load_1m("  \n"), Err(SampleError::Empty("load1"))));
    }

    #[test]
    fn test_parse_load_1m_garbage() {
        assert!(matches!(parse_load_1m("abc 1 2"), Err(SampleError::Parse { .. })));
        assert!(matches!(parse_load_1m("-1.0 1 2"), Err(SampleError::Parse { .. })));
    }
}
