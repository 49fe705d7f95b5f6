//! Client IP extraction utilities.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderName,
};

use crate::cli::IpSource;

fn header_value<B>(request: &Request<B>, name: HeaderName) -> Result<&str, &'static str> {
    request
        .headers()
        .get(name)
        .ok_or("IP header not present")?
        .to_str()
        .map_err(|_| "IP header contains invalid characters")
}

fn parse_ip(value: &str) -> Result<String, &'static str> {
    value
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| "IP header does not contain a valid address")
}

/// Extract the client IP address from the configured source.
///
/// Header sources never fall back to the socket address: a missing or
/// invalid header is an error.
pub fn extract_client_ip<B>(
    request: &Request<B>,
    ip_source: IpSource,
) -> Result<String, &'static str> {
    match ip_source {
        IpSource::Socket => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
        // The left-most entry is the original client.
        IpSource::XForwardedFor => {
            let value = header_value(request, HeaderName::from_static("x-forwarded-for"))?;
            parse_ip(value.split(',').next().unwrap_or_default())
        }
        IpSource::XRealIp => {
            parse_ip(header_value(request, HeaderName::from_static("x-real-ip"))?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_socket_source() {
        let mut req = request(&[]);
        assert!(extract_client_ip(&req, IpSource::Socket).is_err());

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5555))));
        assert_eq!(extract_client_ip(&req, IpSource::Socket).unwrap(), "10.0.0.7");
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let req = request(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1")]);
        assert_eq!(
            extract_client_ip(&req, IpSource::XForwardedFor).unwrap(),
            "203.0.113.9"
        );
    }

    #[test]
    fn test_real_ip() {
        let req = request(&[("x-real-ip", " 2001:db8::1 ")]);
        assert_eq!(
            extract_client_ip(&req, IpSource::XRealIp).unwrap(),
            "2001:db8::1"
        );
    }

    #[test]
    fn test_header_source_does_not_fall_back() {
        let mut req = request(&[("x-real-ip", "not-an-ip")]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5555))));

        assert!(extract_client_ip(&req, IpSource::XRealIp).is_err());
        assert!(extract_client_ip(&req, IpSource::XForwardedFor).is_err());
    }
}
