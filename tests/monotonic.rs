use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use monotonic::{AlreadyBound, Monotonic, NotBound};

#[test]
fn test_new_is_unbound() {
   let cell: Monotonic<i32> = Monotonic::new();
   assert!(!cell.is_bound());
   assert_eq!(cell.get(), Err(NotBound));
}

#[test]
fn test_bound_is_bound() {
   let cell = Monotonic::bound(42);
   assert!(cell.is_bound());
   assert_eq!(cell.get(), Ok(&42));
}

#[test]
fn test_bind_once() {
   let cell = Monotonic::new();
   assert_eq!(cell.get(), Err(NotBound));

   assert_eq!(cell.bind(42), Ok(()));
   assert!(cell.is_bound());
   assert_eq!(cell.get(), Ok(&42));

   // Rejected, and the rejected value comes back
   assert_eq!(cell.bind(13), Err(AlreadyBound(13)));
   assert_eq!(cell.get(), Ok(&42));

   // Even an identical value is refused
   assert_eq!(cell.bind(42), Err(AlreadyBound(42)));
}

#[test]
fn test_bind_if_absent() {
   let cell = Monotonic::new();
   assert_eq!(cell.bind_if_absent("first"), &"first");
   assert_eq!(cell.bind_if_absent("second"), &"first");
   assert_eq!(cell.get(), Ok(&"first"));
}

#[test]
fn test_compute_if_absent() {
   let cell: Monotonic<i32> = Monotonic::new();
   let counter = AtomicUsize::new(0);
   let value = cell.compute_if_absent(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      42
   });
   assert_eq!(value, &42);
   assert!(cell.is_bound());

   // Second call should not execute the closure
   let value = cell.compute_if_absent(|| {
      counter.fetch_add(1, Ordering::SeqCst);
      panic!("Should not be called")
   });
   assert_eq!(value, &42);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_compute_failure_leaves_unbound() {
   let cell: Monotonic<i32> = Monotonic::new();

   let result = cell.try_compute_if_absent(|| Err::<i32, _>("boom"));
   assert_eq!(result, Err("boom"));
   assert!(!cell.is_bound());

   let result = cell.try_compute_if_absent(|| Ok::<_, &str>(7));
   assert_eq!(result, Ok(&7));
   assert!(cell.is_bound());

   // Bound now, so a failing computation is never invoked
   let result = cell.try_compute_if_absent(|| -> Result<i32, &str> { panic!("Should not be called") });
   assert_eq!(result, Ok(&7));
}

#[test]
fn test_compute_panic_leaves_unbound() {
   let cell: Monotonic<String> = Monotonic::new();

   let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
      cell.compute_if_absent(|| panic!("computation blew up"));
   }));
   assert!(outcome.is_err());
   assert!(!cell.is_bound());

   assert_eq!(cell.compute_if_absent(|| "recovered".to_string()), "recovered");
}

#[test]
fn test_bound_none_is_a_value() {
   let cell: Monotonic<Option<u32>> = Monotonic::new();
   assert_eq!(cell.bind(None), Ok(()));
   assert!(cell.is_bound());
   assert_eq!(cell.get(), Ok(&None));
   assert_eq!(cell.compute_if_absent(|| Some(1)), &None);
}

#[test]
fn test_numeric_values_compare_by_value() {
   let wide = Monotonic::new();
   wide.bind(u64::MAX).unwrap();
   assert_eq!(*wide.get().unwrap(), u64::MAX);

   let float = Monotonic::new();
   assert_eq!(float.bind_if_absent(0.5_f64), &0.5);
   assert_eq!(float.compute_if_absent(|| 0.25), &0.5);

   let flag = Monotonic::new();
   flag.bind(true).unwrap();
   assert_eq!(flag, Monotonic::bound(true));
}

#[test]
fn test_multi_thread_compute_if_absent() {
   const THREADS: usize = 16;
   let cell = Arc::new(Monotonic::new());
   let init_counter = Arc::new(AtomicUsize::new(0));
   let barrier = Arc::new(Barrier::new(THREADS));
   let threads: Vec<_> = (0..THREADS)
      .map(|_| {
         let cell = Arc::clone(&cell);
         let counter = Arc::clone(&init_counter);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            *cell.compute_if_absent(|| {
               counter.fetch_add(1, Ordering::SeqCst);
               // Keep the computation in flight while the others pile up
               thread::sleep(Duration::from_millis(20));
               42
            })
         })
      })
      .collect();

   for handle in threads {
      assert_eq!(handle.join().unwrap(), 42);
   }
   assert_eq!(cell.get(), Ok(&42));
   assert_eq!(init_counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_multi_thread_bind_race() {
   let cell = Arc::new(Monotonic::new());
   let successes = Arc::new(AtomicUsize::new(0));
   let threads: Vec<_> = (0..10)
      .map(|i| {
         let cell = Arc::clone(&cell);
         let successes = Arc::clone(&successes);
         thread::spawn(move || match cell.bind(i) {
            Ok(()) => {
               successes.fetch_add(1, Ordering::SeqCst);
               i
            }
            Err(AlreadyBound(_)) => *cell.get().expect("bind failed, so a value is bound"),
         })
      })
      .collect();

   let observed: Vec<_> = threads.into_iter().map(|h| h.join().unwrap()).collect();
   assert_eq!(successes.load(Ordering::SeqCst), 1);
   let winner = *cell.get().unwrap();
   assert!(observed.iter().all(|&v| v == winner));
}

#[test]
fn test_multi_thread_bind_if_absent_witness() {
   const THREADS: usize = 12;
   let cell = Arc::new(Monotonic::new());
   let barrier = Arc::new(Barrier::new(THREADS));
   let threads: Vec<_> = (0..THREADS)
      .map(|i| {
         let cell = Arc::clone(&cell);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            *cell.bind_if_absent(i)
         })
      })
      .collect();

   let witnesses: Vec<_> = threads.into_iter().map(|h| h.join().unwrap()).collect();
   let winner = *cell.get().unwrap();
   assert!(witnesses.iter().all(|&w| w == winner));
}

#[test]
fn test_failed_computation_hands_over_to_waiter() {
   let cell: Arc<Monotonic<i32>> = Arc::new(Monotonic::new());
   let attempts = Arc::new(AtomicUsize::new(0));
   let (started_tx, started_rx) = mpsc::channel();

   let failing = {
      let cell = Arc::clone(&cell);
      let attempts = Arc::clone(&attempts);
      thread::spawn(move || {
         cell
            .try_compute_if_absent(|| {
               attempts.fetch_add(1, Ordering::SeqCst);
               started_tx.send(()).unwrap();
               thread::sleep(Duration::from_millis(50));
               Err("first attempt failed")
            })
            .map(|v| *v)
      })
   };

   started_rx.recv().unwrap();
   // Waits for the failing attempt, then runs its own computation
   let value = cell.try_compute_if_absent(|| {
      attempts.fetch_add(1, Ordering::SeqCst);
      Ok::<_, &str>(7)
   });

   assert_eq!(value, Ok(&7));
   assert_eq!(failing.join().unwrap(), Err("first attempt failed"));
   assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_bind_does_not_wait_for_computation() {
   let cell: Arc<Monotonic<i32>> = Arc::new(Monotonic::new());
   let (started_tx, started_rx) = mpsc::channel();
   let (bound_tx, bound_rx) = mpsc::channel::<()>();

   let computing = {
      let cell = Arc::clone(&cell);
      thread::spawn(move || {
         *cell.compute_if_absent(|| {
            started_tx.send(()).unwrap();
            // Finish only after the main thread has bound its own value
            bound_rx.recv().unwrap();
            99
         })
      })
   };

   started_rx.recv().unwrap();
   assert!(!cell.is_bound());
   assert_eq!(cell.bind(5), Ok(()));
   bound_tx.send(()).unwrap();

   // The computation lost the race and observes the bound value
   assert_eq!(computing.join().unwrap(), 5);
   assert_eq!(cell.get(), Ok(&5));
}

#[test]
fn test_into_inner() {
   assert_eq!(Monotonic::bound(3).into_inner(), Some(3));
   assert_eq!(Monotonic::<i32>::new().into_inner(), None);
}

#[test]
fn test_from() {
   let cell: Monotonic<&str> = "ready".into();
   assert_eq!(cell.get(), Ok(&"ready"));
}

#[test]
fn test_clone_is_a_snapshot() {
   let original = Monotonic::new();
   let empty_clone = original.clone();
   original.bind(1).unwrap();

   assert!(!empty_clone.is_bound());
   let bound_clone = original.clone();
   assert_eq!(bound_clone.get(), Ok(&1));

   // The clones stay independent
   empty_clone.bind(2).unwrap();
   assert_eq!(original.get(), Ok(&1));
}

#[test]
fn test_eq() {
   assert_eq!(Monotonic::<i32>::new(), Monotonic::new());
   assert_eq!(Monotonic::bound(1), Monotonic::bound(1));
   assert_ne!(Monotonic::bound(1), Monotonic::bound(2));
   assert_ne!(Monotonic::bound(1), Monotonic::new());
}

#[test]
fn test_display_and_debug() {
   let cell = Monotonic::new();
   assert_eq!(cell.to_string(), "<unbound>");
   assert_eq!(format!("{cell:?}"), "Monotonic(<unbound>)");
   cell.bind(42).unwrap();
   assert_eq!(cell.to_string(), "42");
   assert_eq!(format!("{cell:?}"), "Monotonic(42)");
}

#[test]
fn test_drop_releases_value() {
   let tracked = Arc::new(());
   {
      let cell = Monotonic::new();
      cell.bind(Arc::clone(&tracked)).unwrap();
      assert_eq!(Arc::strong_count(&tracked), 2);
   }
   assert_eq!(Arc::strong_count(&tracked), 1);

   // A rejected bind hands the value back instead of leaking it
   let cell = Monotonic::bound(Arc::clone(&tracked));
   let rejected = cell.bind(Arc::clone(&tracked)).unwrap_err().into_inner();
   assert_eq!(Arc::strong_count(&tracked), 3);
   drop(rejected);
   drop(cell);
   assert_eq!(Arc::strong_count(&tracked), 1);
}

#[tokio::test]
async fn test_compute_if_absent_async() {
   let cell: Monotonic<i32> = Monotonic::new();
   let counter = AtomicUsize::new(0);

   let value = cell
      .compute_if_absent_async(|| {
         counter.fetch_add(1, Ordering::SeqCst);
         async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            42
         }
      })
      .await;
   assert_eq!(value, &42);

   // Second call should not create the future
   let value = cell
      .compute_if_absent_async(|| async {
         counter.fetch_add(1, Ordering::SeqCst);
         panic!("Should not be called");
      })
      .await;
   assert_eq!(value, &42);
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_try_compute_if_absent_async() {
   let cell: Monotonic<String> = Monotonic::new();

   let result = cell
      .try_compute_if_absent_async(|| async {
         tokio::time::sleep(Duration::from_millis(5)).await;
         Err::<String, _>("async fail")
      })
      .await;
   assert_eq!(result, Err("async fail"));
   assert!(!cell.is_bound());

   let result = cell
      .try_compute_if_absent_async(|| async { Ok::<_, &str>("async ok".to_string()) })
      .await;
   assert_eq!(result.map(String::as_str), Ok("async ok"));
   assert!(cell.is_bound());
}

#[tokio::test]
async fn test_cancelled_async_computation_leaves_unbound() {
   let cell: Monotonic<i32> = Monotonic::new();

   let pending = cell.compute_if_absent_async(|| async {
      tokio::time::sleep(Duration::from_secs(3600)).await;
      1
   });
   let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
   assert!(timed_out.is_err());
   assert!(!cell.is_bound());

   assert_eq!(cell.compute_if_absent_async(|| async { 2 }).await, &2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_multi_task_compute_if_absent_async() {
   let cell: Arc<Monotonic<usize>> = Arc::new(Monotonic::new());
   let counter = Arc::new(AtomicUsize::new(0));

   let tasks: Vec<_> = (0..8)
      .map(|_| {
         let cell = Arc::clone(&cell);
         let counter = Arc::clone(&counter);
         tokio::spawn(async move {
            *cell
               .compute_if_absent_async(|| async move {
                  counter.fetch_add(1, Ordering::SeqCst);
                  tokio::time::sleep(Duration::from_millis(20)).await;
                  7
               })
               .await
         })
      })
      .collect();

   for task in tasks {
      assert_eq!(task.await.unwrap(), 7);
   }
   assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn test_async_waiter_on_current_thread_runtime() {
   let cell: Arc<Monotonic<i32>> = Arc::new(Monotonic::new());
   let (started_tx, started_rx) = tokio::sync::oneshot::channel();

   let computing = {
      let cell = Arc::clone(&cell);
      tokio::spawn(async move {
         *cell
            .compute_if_absent_async(|| async move {
               started_tx.send(()).unwrap();
               tokio::time::sleep(Duration::from_millis(20)).await;
               1
            })
            .await
      })
   };

   started_rx.await.unwrap();
   // The waiter has to give the single worker back to the computing task
   let waiter = {
      let cell = Arc::clone(&cell);
      tokio::spawn(async move {
         tokio::time::timeout(
            Duration::from_secs(2),
            cell.compute_if_absent_async(|| async { 2 }),
         )
         .await
         .map(|value| *value)
      })
   };

   assert_eq!(waiter.await.unwrap(), Ok(1));
   assert_eq!(computing.await.unwrap(), 1);
}

#[test]
fn test_repeated_handovers_never_lose_a_waiter() {
   const THREADS: usize = 8;
   const FAILURES: usize = 200;

   let cell: Arc<Monotonic<usize>> = Arc::new(Monotonic::new());
   let attempts = Arc::new(AtomicUsize::new(0));
   let barrier = Arc::new(Barrier::new(THREADS));

   // Every failed attempt releases the slot and bumps the epoch, so it wraps
   // many times while the other threads are parked
   let threads: Vec<_> = (0..THREADS)
      .map(|_| {
         let cell = Arc::clone(&cell);
         let attempts = Arc::clone(&attempts);
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            loop {
               let result = cell.try_compute_if_absent(|| {
                  let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                  if attempt < FAILURES {
                     Err(attempt)
                  } else {
                     Ok(attempt)
                  }
               });
               if let Ok(value) = result {
                  return *value;
               }
            }
         })
      })
      .collect();

   for handle in threads {
      assert_eq!(handle.join().unwrap(), FAILURES);
   }
   assert_eq!(attempts.load(Ordering::SeqCst), FAILURES + 1);
}
