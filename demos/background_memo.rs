use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use monotonic::{Memoized, ThreadRunner};

static RUNS: AtomicUsize = AtomicUsize::new(0);

fn main() {
   let started = Instant::now();
   let table = Memoized::with_background(
      || {
         RUNS.fetch_add(1, Ordering::Relaxed);
         std::thread::sleep(Duration::from_millis(200));
         (0..1024_u64).map(|n| n * n).collect::<Vec<_>>()
      },
      &ThreadRunner::new().name("table-builder"),
   );

   println!("constructed in {:?}, computed: {}", started.elapsed(), table.is_computed());
   std::thread::sleep(Duration::from_millis(50));
   println!("still computing in the background: {}", !table.is_computed());

   // Waits for the background computation instead of starting another
   println!("table[32] = {} after {:?}", table.get()[32], started.elapsed());
   assert_eq!(RUNS.load(Ordering::Relaxed), 1);
}
