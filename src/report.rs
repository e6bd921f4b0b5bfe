use std::io::{self, Write};

use crate::stats::StatsMap;

/// Writes the endpoint report as indented JSON, endpoints in ascending byte
/// order, averages with exactly one fractional digit.
pub fn write_json<W: Write>(stats: &StatsMap, out: &mut W) -> io::Result<()> {
    let entries = stats.sorted();
    if entries.is_empty() {
        return out.write_all(b"{\n  \"endpoints\": {}\n}\n");
    }

    out.write_all(b"{\n  \"endpoints\": {\n")?;
    for (i, (endpoint, s)) in entries.iter().enumerate() {
        if i > 0 {
            out.write_all(b",\n")?;
        }
        out.write_all(b"    ")?;
        serde_json::to_writer(&mut *out, endpoint.as_str())?;
        write!(
            out,
            ": {{\n      \"min_response_time\": {},\n      \"avg_response_time\": {:.1},\n      \"max_response_time\": {}\n    }}",
            s.min,
            s.mean(),
            s.max
        )?;
    }
    out.write_all(b"\n  }\n}\n")
}

pub fn to_json_string(stats: &StatsMap) -> io::Result<String> {
    let mut out = Vec::new();
    write_json(stats, &mut out)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Endpoint;
    use serde_json::Value;

    fn map_of(samples: &[(&str, u64)]) -> StatsMap {
        let mut map = StatsMap::new();
        for &(endpoint, rt) in samples {
            map.observe(Endpoint::from(endpoint), rt);
        }
        map
    }

    #[test]
    fn empty_map_renders_empty_object() {
        let json = to_json_string(&StatsMap::new()).unwrap();
        assert_eq!(json, "{\n  \"endpoints\": {}\n}\n");
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"endpoints": {}}));
    }

    #[test]
    fn renders_documented_layout() {
        let json = to_json_string(&map_of(&[("/a", 10), ("/a", 50), ("/a", 20)])).unwrap();
        assert_eq!(
            json,
            concat!(
                "{\n",
                "  \"endpoints\": {\n",
                "    \"/a\": {\n",
                "      \"min_response_time\": 10,\n",
                "      \"avg_response_time\": 26.7,\n",
                "      \"max_response_time\": 50\n",
                "    }\n",
                "  }\n",
                "}\n",
            )
        );
    }

    #[test]
    fn average_always_has_one_decimal() {
        let json = to_json_string(&map_of(&[("/half", 2), ("/half", 3), ("/whole", 4)])).unwrap();
        assert!(json.contains("\"avg_response_time\": 2.5,"));
        assert!(json.contains("\"avg_response_time\": 4.0,"));
    }

    #[test]
    fn endpoints_are_sorted_and_escaped() {
        let json = to_json_string(&map_of(&[("/z", 1), ("/q\"uote", 2), ("/a", 3)])).unwrap();
        let a = json.find("\"/a\"").unwrap();
        let q = json.find("\"/q\\\"uote\"").unwrap();
        let z = json.find("\"/z\"").unwrap();
        assert!(a < q && q < z);

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["endpoints"]["/q\"uote"]["min_response_time"], 2);
        assert_eq!(value["endpoints"]["/z"]["avg_response_time"], 1.0);
    }
}
