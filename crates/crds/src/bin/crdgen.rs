//! Prints the CRD manifests for every registered kind as a multi-document YAML stream.
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crds.yaml
//! ```

use crds::registered_kinds;

fn main() -> anyhow::Result<()> {
    for kind in registered_kinds() {
        let crd = (kind.crd)();
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
