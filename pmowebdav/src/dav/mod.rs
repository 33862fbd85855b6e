//! Couche protocolaire WebDAV : rendu XML, dispatcher et favoritage

pub mod favorites;
pub mod handlers;
pub mod xml;
