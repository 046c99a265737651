//! Core HTTP protocol types shared by the pooled model

use std::fmt;

// METHOD

/// HTTP request methods
///
/// The pooled [`Request`](crate::Request) stores the method as raw bytes, so
/// extension methods survive a translation untouched. This enum covers the
/// methods registered in
/// [RFC 9110, Section 9](https://datatracker.ietf.org/doc/html/rfc9110#section-9)
/// and [RFC 5789](https://datatracker.ietf.org/doc/html/rfc5789).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method - transfer a current representation of the target resource
    Get,
    /// PUT method - replace all current representations of the target resource
    Put,
    /// POST method - perform resource-specific processing on the request payload
    Post,
    /// HEAD method - same as GET but without response body
    Head,
    /// PATCH method - apply partial modifications to a resource
    Patch,
    /// DELETE method - remove all current representations of the target resource
    Delete,
    /// OPTIONS method - describe the communication options for the target resource
    Options,
    /// TRACE method - message loop-back test along the path to the target resource
    Trace,
    /// CONNECT method - establish a tunnel to the server identified by the target
    Connect,
}

impl Method {
    /// Parses an exact, case-sensitive method token.
    #[inline]
    pub const fn from_bytes(src: &[u8]) -> Option<Self> {
        match src {
            b"GET" => Some(Method::Get),
            b"PUT" => Some(Method::Put),
            b"POST" => Some(Method::Post),
            b"HEAD" => Some(Method::Head),
            b"PATCH" => Some(Method::Patch),
            b"DELETE" => Some(Method::Delete),
            b"OPTIONS" => Some(Method::Options),
            b"TRACE" => Some(Method::Trace),
            b"CONNECT" => Some(Method::Connect),
            _ => None,
        }
    }

    /// Returns the method token.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// STATUS_CODE

macro_rules! set_status_codes {
    ($( $name:ident = ($num:literal, $str:literal); )+) => {
        /// HTTP status codes
        ///
        /// Named codes registered with IANA. A [`Response`](crate::Response)
        /// stores the numeric code, so any value accepted by
        /// [`set_status_code`](crate::Response::set_status_code) is carried through.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum StatusCode { $(
            #[doc = concat!(stringify!($num), " ", $str)]
            $name = $num,
        )+ }

        impl StatusCode {
            /// Returns the numeric code.
            #[inline]
            pub const fn as_u16(&self) -> u16 {
                *self as u16
            }

            /// Returns the canonical reason phrase (e.g. `"Not Found"`).
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self { $(
                    StatusCode::$name => $str,
                )+ }
            }

            /// Looks up a named code.
            #[inline]
            pub const fn from_u16(code: u16) -> Option<Self> {
                match code { $(
                    $num => Some(StatusCode::$name),
                )+
                    _ => None,
                }
            }
        }
    }
}

set_status_codes! {
    Continue = (100, "Continue");
    SwitchingProtocols = (101, "Switching Protocols");
    Processing = (102, "Processing");
    EarlyHints = (103, "Early Hints");

    Ok = (200, "OK");
    Created = (201, "Created");
    Accepted = (202, "Accepted");
    NonAuthoritativeInformation = (203, "Non Authoritative Information");
    NoContent = (204, "No Content");
    ResetContent = (205, "Reset Content");
    PartialContent = (206, "Partial Content");
    MultiStatus = (207, "Multi-Status");
    AlreadyReported = (208, "Already Reported");
    ImUsed = (226, "IM Used");

    MultipleChoices = (300, "Multiple Choices");
    MovedPermanently = (301, "Moved Permanently");
    Found = (302, "Found");
    SeeOther = (303, "See Other");
    NotModified = (304, "Not Modified");
    UseProxy = (305, "Use Proxy");
    TemporaryRedirect = (307, "Temporary Redirect");
    PermanentRedirect = (308, "Permanent Redirect");

    BadRequest = (400, "Bad Request");
    Unauthorized = (401, "Unauthorized");
    PaymentRequired = (402, "Payment Required");
    Forbidden = (403, "Forbidden");
    NotFound = (404, "Not Found");
    MethodNotAllowed = (405, "Method Not Allowed");
    NotAcceptable = (406, "Not Acceptable");
    ProxyAuthenticationRequired = (407, "Proxy Authentication Required");
    RequestTimeout = (408, "Request Timeout");
    Conflict = (409, "Conflict");
    Gone = (410, "Gone");
    LengthRequired = (411, "Length Required");
    PreconditionFailed = (412, "Precondition Failed");
    PayloadTooLarge = (413, "Payload Too Large");
    UriTooLong = (414, "URI Too Long");
    UnsupportedMediaType = (415, "Unsupported Media Type");
    RangeNotSatisfiable = (416, "Range Not Satisfiable");
    ExpectationFailed = (417, "Expectation Failed");
    ImaTeapot = (418, "I'm a teapot");
    MisdirectedRequest = (421, "Misdirected Request");
    UnprocessableEntity = (422, "Unprocessable Entity");
    Locked = (423, "Locked");
    FailedDependency = (424, "Failed Dependency");
    TooEarly = (425, "Too Early");
    UpgradeRequired = (426, "Upgrade Required");
    PreconditionRequired = (428, "Precondition Required");
    TooManyRequests = (429, "Too Many Requests");
    RequestHeaderFieldsTooLarge = (431, "Request Header Fields Too Large");
    UnavailableForLegalReasons = (451, "Unavailable For Legal Reasons");

    InternalServerError = (500, "Internal Server Error");
    NotImplemented = (501, "Not Implemented");
    BadGateway = (502, "Bad Gateway");
    ServiceUnavailable = (503, "Service Unavailable");
    GatewayTimeout = (504, "Gateway Timeout");
    HttpVersionNotSupported = (505, "HTTP Version Not Supported");
    VariantAlsoNegotiates = (506, "Variant Also Negotiates");
    InsufficientStorage = (507, "Insufficient Storage");
    LoopDetected = (508, "Loop Detected");
    NotExtended = (510, "Not Extended");
    NetworkAuthenticationRequired = (511, "Network Authentication Required");
}

impl From<StatusCode> for u16 {
    #[inline]
    fn from(status: StatusCode) -> u16 {
        status.as_u16()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}
