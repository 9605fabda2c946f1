//! FAFB neuropil and antennal lobe glomerulus name catalogues.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Core neuropils that make up the FAFB brain mesh (after the elmr
/// `FAFBNP.surf` region list).
pub const FAFB_CORE_NEUROPILS: &[&str] = &[
    "AME_R", "LO_R", "NO", "BU_R", "PB", "LH_R", "LAL_R", "SAD", "CAN_R", "AMMC_R", "ICL_R",
    "VES_R", "IB_R", "ATL_R", "CRE_R", "MB_PED_R", "MB_VL_R", "MB_ML_R", "FLA_R", "LOP_R", "EB",
    "AL_R", "ME_R", "FB", "SLP_R", "SIP_R", "SMP_R", "AVLP_R", "PVLP_R", "WED_R", "PLP_R",
    "AOTU_R", "GOR_R", "MB_CA_R", "SPS_R", "IPS_R", "SCL_R", "EPA_R", "GNG", "PRW", "GA_R",
    "AME_L", "LO_L", "BU_L", "LH_L", "LAL_L", "CAN_L", "AMMC_L", "ICL_L", "VES_L", "IB_L",
    "ATL_L", "CRE_L", "MB_PED_L", "MB_VL_L", "MB_ML_L", "FLA_L", "LOP_L", "AL_L", "ME_L",
    "SLP_L", "SIP_L", "SMP_L", "AVLP_L", "PVLP_L", "WED_L", "PLP_L", "AOTU_L", "GOR_L",
    "MB_CA_L", "SPS_L", "IPS_L", "SCL_L", "EPA_L", "GA_L",
];

/// Owned copy of [`FAFB_CORE_NEUROPILS`], ready for volume lookups.
pub fn fafb_core_neuropils() -> Vec<String> {
    FAFB_CORE_NEUROPILS.iter().map(|s| s.to_string()).collect()
}

/// Which glomerulus meshes to select.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    #[default]
    Right,
    Left,
    Both,
    /// Glomeruli traced in the FIB dataset.
    Fib,
}

/// Substrings marking v14 volumes that are not glomeruli.
const NON_GLOMERULUS_MARKERS: &[&str] = &["Lo", "LC6", "neuropil", "LPC", "LP_", "right", "_ORNs"];

/// VP sub-volumes superseded by the combined VP meshes.
static SUPERSEDED_VP_VOLUMES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    [
        "v14.VP1", "v14.VP2", "v14.VP3", "v14.VP4", "v14.VP5", "v14.VP1m", "v14.VP1l",
        "v14.VP1d", "v14.VC5", "v14.VP1_L", "v14.VP2_L", "v14.VP3_L", "v14.VP4_L", "v14.VP5_L",
        "v14.VP1m_L", "v14.VP1l_L", "v14.VP1d_L", "v14.VC5_L",
    ]
    .into_iter()
    .collect()
});

static V14_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^v14\.|_new").unwrap());
static FIB_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"FIB\.").unwrap());

/// Pick glomerulus volumes out of a server's volume listing.
///
/// Returns `(server_name, glomerulus_name)` pairs in listing order, where the
/// glomerulus name has the dataset prefix and `_new` suffix stripped.
pub fn select_glomeruli(names: &[String], hemisphere: Hemisphere) -> Vec<(String, String)> {
    names
        .iter()
        .filter(|name| is_glomerulus(name, hemisphere))
        .map(|name| (name.clone(), clean_glomerulus_name(name, hemisphere)))
        .collect()
}

fn is_glomerulus(name: &str, hemisphere: Hemisphere) -> bool {
    if hemisphere == Hemisphere::Fib {
        return name.starts_with("FIB") && !name.ends_with("neuropil");
    }
    if !name.starts_with("v14") {
        return false;
    }
    if NON_GLOMERULUS_MARKERS.iter().any(|m| name.contains(m)) {
        return false;
    }
    if SUPERSEDED_VP_VOLUMES.contains(name) {
        return false;
    }
    match hemisphere {
        Hemisphere::Right => !name.ends_with("_L"),
        Hemisphere::Left => name.ends_with("_L"),
        Hemisphere::Both | Hemisphere::Fib => true,
    }
}

fn clean_glomerulus_name(name: &str, hemisphere: Hemisphere) -> String {
    match hemisphere {
        Hemisphere::Fib => FIB_NAME.replace_all(name, "").into_owned(),
        _ => V14_NAME.replace_all(name, "").into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<String> {
        [
            "v14.DA1",
            "v14.DA1_L",
            "v14.VA1v_new",
            "v14.VP1",
            "v14.VP1_L",
            "v14.LC6",
            "v14.neuropil",
            "v14.Lo_R",
            "v14.DL3_ORNs",
            "FIB.DA1",
            "FIB.neuropil",
            "AL_R",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    #[test]
    fn core_neuropil_list() {
        assert_eq!(FAFB_CORE_NEUROPILS.len(), 75);
        assert!(FAFB_CORE_NEUROPILS.contains(&"LH_R"));
        assert!(FAFB_CORE_NEUROPILS.contains(&"AL_L"));
        assert_eq!(fafb_core_neuropils().len(), 75);
    }

    #[test]
    fn right_hemisphere_glomeruli() {
        let got = select_glomeruli(&listing(), Hemisphere::Right);
        assert_eq!(
            got,
            vec![
                ("v14.DA1".to_string(), "DA1".to_string()),
                ("v14.VA1v_new".to_string(), "VA1v".to_string()),
            ]
        );
    }

    #[test]
    fn left_and_both() {
        let left = select_glomeruli(&listing(), Hemisphere::Left);
        assert_eq!(left, vec![("v14.DA1_L".to_string(), "DA1_L".to_string())]);
        let both = select_glomeruli(&listing(), Hemisphere::Both);
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn fib_glomeruli() {
        let fib = select_glomeruli(&listing(), Hemisphere::Fib);
        assert_eq!(fib, vec![("FIB.DA1".to_string(), "DA1".to_string())]);
    }
}
