use anyhow::Result;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::case::Case;
use crate::network::Network;

/// Reads a network from a JSON file of element tables.
pub fn load_network(path: &Path) -> Result<Network> {
    let file = File::open(path)?;
    let net = serde_json::from_reader(BufReader::new(file))?;
    Ok(net)
}

/// Writes a converted case as JSON. The solver-facing cache is skipped.
pub fn write_case(path: &Path, case: &Case) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), case)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_round_trips_through_json() -> Result<()> {
        let json = r#"{
            "sn_mva": 100.0,
            "bus": [
                {"index": 1, "vn_kv": 110.0},
                {"index": 5, "vn_kv": 110.0, "in_service": false}
            ],
            "ext_grid": [{"bus": 1, "vm_pu": 1.02}],
            "line": [{"from_bus": 1, "to_bus": 5, "length_km": 2.5,
                      "r_ohm_per_km": 0.1, "x_ohm_per_km": 0.4}],
            "switch": [{"bus": 1, "element": 0, "et": "l", "closed": false}]
        }"#;
        let net: Network = serde_json::from_str(json)?;

        assert_eq!(net.bus.len(), 2);
        assert!(net.bus[0].in_service);
        assert!(!net.bus[1].in_service);
        assert_eq!(net.ext_grid[0].vm_pu, 1.02);
        assert_eq!(net.line[0].length_km, 2.5);
        assert!(!net.switch[0].closed);

        let back: Network = serde_json::from_str(&serde_json::to_string(&net)?)?;
        assert_eq!(back.bus[1].index, 5);
        Ok(())
    }

    #[test]
    fn omitted_scalars_get_nominal_defaults() -> Result<()> {
        // a network without f_hz/sn_mva must not end up with a zero
        // frequency (zero charging susceptance) or a zero power base
        let net: Network = serde_json::from_str(
            r#"{"bus": [{"index": 0, "vn_kv": 110.0}]}"#,
        )?;
        assert_eq!(net.f_hz, 50.0);
        assert_eq!(net.sn_mva, 1.0);
        Ok(())
    }
}
