use monotonic::{MonotonicMap, SlotError};

fn parse_port(service: &&str) -> Result<u16, String> {
   match *service {
      "http" => Ok(80),
      "https" => Ok(443),
      other => Err(format!("no well-known port for {other}")),
   }
}

fn main() {
   let ports: MonotonicMap<&str, u16> = MonotonicMap::new(["http", "https", "gopher"]);

   for service in ["https", "gopher", "ftp"] {
      match ports.try_compute_if_absent(service, parse_port) {
         Ok(port) => println!("{service}: {port}"),
         Err(SlotError::Compute(error)) => println!("{service}: computation failed ({error})"),
         Err(error) => println!("{service}: {error}"),
      }
   }

   // The failed slot stays empty and can be bound later
   assert!(!ports.get("gopher").unwrap().is_bound());
   assert_eq!(ports.get("gopher").unwrap().bind_if_absent(70), &70);

   for (service, port) in ports.bound() {
      println!("bound {service} => {port}");
   }
}
