use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use croak::code;
use croak::config::Config;
use croak::dispatch::Disposition;
use croak::engine::Drain;
use croak::respond::Exchange;
use croak::route::Route;
use croak_msg::opt::ContentFormat;

static HITS: AtomicUsize = AtomicUsize::new(0);

fn hello(ex: &mut Exchange<'_>, _: usize) -> Disposition {
  let name = ex.query().strip_prefix("name=").unwrap_or("world").to_string();
  ex.append_payload_fmt(format_args!("Hello, {}!", name), ContentFormat::Text)
    .ok();
  Disposition::SendResponse
}

fn echo(ex: &mut Exchange<'_>, _: usize) -> Disposition {
  let payload = ex.payload(|p| p.to_vec());
  ex.respond(code::CHANGED).ok();
  ex.append_payload(&payload, ContentFormat::OctetStream).ok();
  Disposition::SendResponse
}

fn hits(ex: &mut Exchange<'_>, _: usize) -> Disposition {
  let n = HITS.fetch_add(1, Ordering::Relaxed) + 1;
  ex.append_payload_fmt(format_args!("{}", n), ContentFormat::Text)
    .ok();
  Disposition::SendResponse
}

pub fn main() {
  simple_logger::init_with_level(log::Level::Info).unwrap();

  let routes = vec![Route::new("hello").get(hello),
                    Route::new("echo").post(echo),
                    Route::new("hits").get(hits)];

  let engine = croak::std::bind(("0.0.0.0", croak::DEFAULT_PORT), Config::default(), routes).unwrap();

  std::thread::scope(|s| {
    s.spawn(|| loop {
       match engine.poll_udp() {
         | Ok(()) => (),
         | Err(nb::Error::WouldBlock) => std::thread::sleep(Duration::from_millis(1)),
         | Err(nb::Error::Other(e)) => log::warn!("{:?}", e),
       }
     });

    loop {
      if let Err(e) = engine.poll(Drain::All) {
        log::error!("{:?}", e);
      }

      let status = engine.take_status();
      if !status.is_empty() {
        log::warn!("status {:?}; {:?}", status, engine.stats());
      }

      std::thread::sleep(Duration::from_millis(5));
    }
  });
}
