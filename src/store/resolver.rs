// Latest-Result Resolver - authoritative scan selection per cluster
//
// Every read-side aggregation (dashboard totals, result listings, exports)
// must scope certificate queries to the scan ids this resolver selects, never
// the raw record table. This is what keeps a currently-running or failed scan
// from corrupting reported counts, and what makes supersession of old results
// logical rather than physical.

use crate::store::models::{ScanRun, ScanState};
use std::collections::HashMap;
use uuid::Uuid;

/// Select, for each cluster, the single authoritative scan: the most recent
/// `Completed` run. `InProgress` and `Failed` runs are never eligible,
/// regardless of recency. Ties on `started_at` break toward the greater id
/// (ids are time-ordered), so selection is deterministic.
///
/// Clusters with no completed run are simply absent from the result.
pub fn latest_completed<'a, I>(runs: I) -> HashMap<Uuid, &'a ScanRun>
where
    I: IntoIterator<Item = &'a ScanRun>,
{
    let mut latest: HashMap<Uuid, &'a ScanRun> = HashMap::new();

    for run in runs {
        if run.state != ScanState::Completed {
            continue;
        }
        match latest.get(&run.cluster_id) {
            Some(current) if (run.started_at, run.id) <= (current.started_at, current.id) => {}
            _ => {
                latest.insert(run.cluster_id, run);
            }
        }
    }

    latest
}
