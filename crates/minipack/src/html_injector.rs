//! Injection of the live-reload client into an HTML page

use cow_utils::CowUtils;

/// Script that reloads the page when the dev server sends [`RELOAD_TOKEN`]
pub const LIVE_RELOAD_SNIPPET: &str = r#"<script type="text/javascript">
  (function () {
    if (!("WebSocket" in window)) {
      console.log("Upgrade your browser. This browser does not support live reload.");
      return;
    }
    var socket = new WebSocket("ws://" + window.location.hostname + ":8999");
    socket.onmessage = function (message) {
      if (message.data === "update") {
        window.location.reload();
      }
    };
    console.log("Live reload enabled.");
  })();
</script>
"#;

/// Message broadcast to live clients after a rebuild
pub const RELOAD_TOKEN: &str = "update";

/// Closing tag the snippet is inserted in front of
#[derive(Debug, Clone, Copy)]
struct InjectionMarker {
    tag: &'static str,
    case_insensitive: bool,
}

/// Tried in order; the first marker found wins
const INJECTION_MARKERS: &[InjectionMarker] = &[
    InjectionMarker {
        tag: "</body>",
        case_insensitive: true,
    },
    InjectionMarker {
        tag: "</svg>",
        case_insensitive: false,
    },
    InjectionMarker {
        tag: "</head>",
        case_insensitive: true,
    },
];

/// Insert `snippet` right before the highest-priority closing marker found in
/// `html`.
///
/// A marker is selected by its own case rule, then the snippet goes in front
/// of the first occurrence of that tag in any case. Returns `None` when the
/// document has none of the markers.
pub fn inject(html: &str, snippet: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets valid for the original text
    let lowered = html.cow_to_ascii_lowercase();

    let marker = INJECTION_MARKERS.iter().find(|marker| {
        if marker.case_insensitive {
            lowered.contains(marker.tag)
        } else {
            html.contains(marker.tag)
        }
    })?;
    let position = lowered.find(marker.tag)?;

    let mut output = String::with_capacity(html.len() + snippet.len());
    output.push_str(&html[..position]);
    output.push_str(snippet);
    output.push_str(&html[position..]);
    Some(output)
}
