#![no_main]

use libfuzzer_sys::fuzz_target;
use sightline::trace::TraceStore;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must yield a store or an IngestError, never a panic
    if let Ok(store) = TraceStore::from_json_slice(data) {
        for entity in store.entities() {
            let _ = store.rounds_of(entity);
        }
    }
});
