use super::OptNumber;

macro_rules! opt {
  (#[doc = $doc:expr] $name:ident = $n:literal) => {
    #[doc = $doc]
    pub const $name: OptNumber = OptNumber($n);
  };
}

opt!(#[doc = "If-Match (repeatable), RFC7252 5.10.8.1"]
     IF_MATCH = 1);
opt!(#[doc = "Uri-Host, RFC7252 5.10.1"]
     URI_HOST = 3);
opt!(#[doc = "ETag (repeatable), RFC7252 5.10.6"]
     ETAG = 4);
opt!(#[doc = "If-None-Match, RFC7252 5.10.8.2"]
     IF_NONE_MATCH = 5);
opt!(#[doc = "Uri-Port, RFC7252 5.10.1"]
     URI_PORT = 7);
opt!(#[doc = "Location-Path (repeatable), RFC7252 5.10.7"]
     LOCATION_PATH = 8);
opt!(#[doc = "Uri-Path (repeatable), one option per path segment, RFC7252 5.10.1"]
     URI_PATH = 11);
opt!(#[doc = "Content-Format, RFC7252 5.10.3"]
     CONTENT_FORMAT = 12);
opt!(#[doc = "Max-Age, RFC7252 5.10.5"]
     MAX_AGE = 14);
opt!(#[doc = "Uri-Query (repeatable), one option per `key=value` term, RFC7252 5.10.1"]
     URI_QUERY = 15);
opt!(#[doc = "Accept, RFC7252 5.10.4"]
     ACCEPT = 17);
opt!(#[doc = "Location-Query (repeatable), RFC7252 5.10.7"]
     LOCATION_QUERY = 20);
opt!(#[doc = "Block2, RFC7959 2.1"]
     BLOCK2 = 23);
opt!(#[doc = "Block1, RFC7959 2.1"]
     BLOCK1 = 27);
opt!(#[doc = "Proxy-Uri, RFC7252 5.10.2"]
     PROXY_URI = 35);
opt!(#[doc = "Proxy-Scheme, RFC7252 5.10.2"]
     PROXY_SCHEME = 39);
opt!(#[doc = "Size1, RFC7252 5.10.9"]
     SIZE1 = 60);

/// Every option number an inbound request may carry
pub const RECOGNIZED: [OptNumber; 17] = [IF_MATCH,
                                         URI_HOST,
                                         ETAG,
                                         IF_NONE_MATCH,
                                         URI_PORT,
                                         LOCATION_PATH,
                                         URI_PATH,
                                         CONTENT_FORMAT,
                                         MAX_AGE,
                                         URI_QUERY,
                                         ACCEPT,
                                         LOCATION_QUERY,
                                         BLOCK2,
                                         BLOCK1,
                                         PROXY_URI,
                                         PROXY_SCHEME,
                                         SIZE1];

/// Whether `n` is one of [`RECOGNIZED`]
pub fn is_recognized(n: OptNumber) -> bool {
  RECOGNIZED.contains(&n)
}
