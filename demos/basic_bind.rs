use std::sync::atomic::{AtomicUsize, Ordering};

use monotonic::Monotonic;

static COUNTER: AtomicUsize = AtomicUsize::new(0);
static DATA: Monotonic<String> = Monotonic::new();

fn get_data() -> &'static str {
   DATA.compute_if_absent(|| {
      // This closure runs only once
      COUNTER.fetch_add(1, Ordering::Relaxed);
      println!("Computing data...");
      std::thread::sleep(std::time::Duration::from_millis(50));
      "Expensive data".to_string()
   })
}

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|_| {
         std::thread::spawn(|| {
            println!("Thread access: {}", get_data());
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(DATA.get().map(String::as_str), Ok("Expensive data"));
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1);

   match DATA.bind("Too late".to_string()) {
      Ok(()) => panic!("Should have been rejected"),
      Err(rejected) => println!("Rejected {:?}: {rejected}", rejected.0),
   }
   println!("Final data: {}", get_data());
}
