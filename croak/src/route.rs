use core::fmt;

use std_alloc::vec::Vec;

use crate::code::Method;
use crate::dispatch::Disposition;
use crate::respond::Exchange;

/// A request handler.
///
/// Gets the request through the [`Exchange`] and the route's
/// opaque argument, and says whether the response it built (if any)
/// should be sent.
pub type Handler = fn(&mut Exchange<'_>, usize) -> Disposition;

/// One resource: a path and the handlers for the methods it supports.
///
/// Only GET and POST are routed; PUT and DELETE are reserved and
/// always answered with 4.05.
#[derive(Clone, Copy)]
pub struct Route {
  /// Path without a leading `/`, matched exactly against the
  /// request's joined Uri-Path
  pub uri: &'static str,
  /// GET handler
  pub get: Option<Handler>,
  /// POST handler
  pub post: Option<Handler>,
  /// Passed to every handler of this route
  pub arg: usize,
}

impl fmt::Debug for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Route")
     .field("uri", &self.uri)
     .field("get", &self.get.is_some())
     .field("post", &self.post.is_some())
     .field("arg", &self.arg)
     .finish()
  }
}

impl Route {
  /// A route with no handlers
  pub const fn new(uri: &'static str) -> Self {
    Route { uri,
            get: None,
            post: None,
            arg: 0 }
  }

  /// Handle GET
  pub const fn get(mut self, h: Handler) -> Self {
    self.get = Some(h);
    self
  }

  /// Handle POST
  pub const fn post(mut self, h: Handler) -> Self {
    self.post = Some(h);
    self
  }

  /// Set the argument passed to this route's handlers
  pub const fn arg(mut self, arg: usize) -> Self {
    self.arg = arg;
    self
  }

  /// The handler for a method, if this route has one
  pub fn handler(&self, method: Method) -> Option<Handler> {
    match method {
      | Method::GET => self.get,
      | Method::POST => self.post,
      | _ => None,
    }
  }
}

/// A table of routes, searched by exact path
pub trait Routes {
  /// Find the route whose `uri` is exactly `uri`
  fn lookup(&self, uri: &str) -> Option<&Route>;
}

impl Routes for [Route] {
  fn lookup(&self, uri: &str) -> Option<&Route> {
    self.iter().find(|r| r.uri == uri)
  }
}

impl<const N: usize> Routes for [Route; N] {
  fn lookup(&self, uri: &str) -> Option<&Route> {
    self.as_slice().lookup(uri)
  }
}

impl Routes for Vec<Route> {
  fn lookup(&self, uri: &str) -> Option<&Route> {
    self.as_slice().lookup(uri)
  }
}

impl<'a, R: Routes + ?Sized> Routes for &'a R {
  fn lookup(&self, uri: &str) -> Option<&Route> {
    (**self).lookup(uri)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ok(_: &mut Exchange<'_>, _: usize) -> Disposition {
    Disposition::NoResponse
  }

  #[test]
  fn lookup_is_exact() {
    let routes = [Route::new("sys/ver").get(ok),
                  Route::new("sys").post(ok).arg(7)];

    assert_eq!(routes.lookup("sys").map(|r| r.arg), Some(7));
    assert!(routes.lookup("sys/ver").is_some());
    assert!(routes.lookup("sys/").is_none());
    assert!(routes.lookup("/sys").is_none());
  }

  #[test]
  fn handler_per_method() {
    let route = Route::new("a").get(ok);
    assert!(route.handler(Method::GET).is_some());
    assert!(route.handler(Method::POST).is_none());
  }

  #[test]
  fn put_and_delete_are_never_routed() {
    let route = Route::new("a").get(ok).post(ok);
    assert!(route.handler(Method::PUT).is_none());
    assert!(route.handler(Method::DELETE).is_none());
  }
}
