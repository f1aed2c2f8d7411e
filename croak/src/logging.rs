use core::fmt::Write;

use croak_msg::Header;
use no_std_net::SocketAddr;

use crate::net::Transport;
use crate::writable::Writable;

pub(crate) fn msg_summary(transport: Transport,
                          addr: SocketAddr,
                          hdr: &Header,
                          body_len: usize)
                          -> Writable<[u8; 128]> {
  let mut buf: Writable<[u8; 128]> = Default::default();
  write!(buf,
         "{:?} {:?} {} id={} tkl={} {}b {}",
         transport,
         hdr.ty,
         hdr.code,
         hdr.id.0,
         hdr.tkl,
         body_len,
         addr).ok();
  buf
}
