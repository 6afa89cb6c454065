//! Scatter plot construction.
//!
//! Figures are plain serde structs in the shape plotly.js expects, so the
//! same [`Figure`] feeds the static HTML export and the dashboard API.

use crate::config::PartyColor;
use crate::reduction::{EmbeddedMember, Embedding};
use serde::Serialize;

/// Opacity of points that do not match an active search
pub const DIMMED_OPACITY: f64 = 0.2;

const MARKER_SIZE: u32 = 10;

/// Colors for parties missing from the palette, cycled in order
const FALLBACK_COLORS: &[&str] = &[
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Party → color, in legend order
#[derive(Debug, Clone, PartialEq)]
pub struct PartyPalette {
    entries: Vec<(String, String)>,
}

impl Default for PartyPalette {
    fn default() -> Self {
        let entries = [
            ("더불어민주당", "#000dff"),
            ("국민의힘", "#E61E2B"),
            ("정의당", "#ffed00"),
            ("진보당", "#d6001C"),
            ("개혁신당", "#ff4d00"),
            ("조국혁신당", "#06275e"),
            ("사회민주당", "#f58400"),
            ("기본소득당", "#00D2C3"),
            ("무소속", "grey"),
        ]
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect();
        Self { entries }
    }
}

impl PartyPalette {
    /// Built-in palette with configured colors replacing or extending it
    pub fn with_overrides(overrides: &[PartyColor]) -> Self {
        let mut palette = Self::default();
        for pc in overrides {
            match palette.entries.iter_mut().find(|(p, _)| *p == pc.party) {
                Some(entry) => entry.1 = pc.color.clone(),
                None => palette.entries.push((pc.party.clone(), pc.color.clone())),
            }
        }
        palette
    }

    pub fn color_of(&self, party: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == party)
            .map(|(_, c)| c.as_str())
    }

    /// Legend order for the parties present: palette order first, then the
    /// rest alphabetically with fallback colors.
    pub fn assign(&self, present: &[&str]) -> Vec<(String, String)> {
        let mut assigned: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(p, _)| present.contains(&p.as_str()))
            .cloned()
            .collect();

        let mut unknown: Vec<&str> = present
            .iter()
            .copied()
            .filter(|p| self.color_of(p).is_none())
            .collect();
        unknown.sort_unstable();
        unknown.dedup();

        for (i, party) in unknown.into_iter().enumerate() {
            let color = FALLBACK_COLORS[i % FALLBACK_COLORS.len()];
            assigned.push((party.to_string(), color.to_string()));
        }
        assigned
    }
}

/// Interactive state of the plot
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// Highlight members whose name contains this text
    pub search: Option<String>,
    /// Draw member names next to markers
    pub show_labels: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            search: None,
            show_labels: true,
        }
    }
}

/// Whether `name` matches a search term (trimmed, case-insensitive substring)
pub fn matches_search(name: &str, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    needle.is_empty() || name.to_lowercase().contains(&needle)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub size: u32,
    pub color: String,
    pub opacity: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    pub textposition: &'static str,
    pub hovertext: Vec<String>,
    pub hoverinfo: &'static str,
    /// Member page URL per point, if known
    pub customdata: Vec<Option<String>>,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub hovermode: &'static str,
    pub dragmode: &'static str,
    pub showlegend: bool,
    pub legend: Legend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    /// Number of points drawn at full opacity
    pub fn highlighted(&self) -> usize {
        self.data
            .iter()
            .flat_map(|t| t.marker.opacity.iter())
            .filter(|o| **o >= 1.0)
            .count()
    }
}

/// Build the scatter plot: one trace per party
pub fn build_figure(
    embedding: &Embedding,
    palette: &PartyPalette,
    options: &PlotOptions,
    title: &str,
) -> Figure {
    let parties = palette.assign(&embedding.parties());

    let data = parties
        .into_iter()
        .map(|(party, color)| {
            let points: Vec<&EmbeddedMember> = embedding
                .points
                .iter()
                .filter(|p| p.party == party)
                .collect();

            let opacity = points
                .iter()
                .map(|p| match options.search.as_deref() {
                    Some(search) if !matches_search(&p.name, search) => DIMMED_OPACITY,
                    _ => 1.0,
                })
                .collect();

            Trace {
                kind: "scatter",
                mode: if options.show_labels {
                    "markers+text"
                } else {
                    "markers"
                },
                x: points.iter().map(|p| p.x).collect(),
                y: points.iter().map(|p| p.y).collect(),
                text: options
                    .show_labels
                    .then(|| points.iter().map(|p| p.name.clone()).collect()),
                textposition: "top center",
                hovertext: points
                    .iter()
                    .map(|p| format!("{} ({})", p.name, p.party))
                    .collect(),
                hoverinfo: "text",
                customdata: points.iter().map(|p| p.url.clone()).collect(),
                marker: Marker {
                    size: MARKER_SIZE,
                    color,
                    opacity,
                },
                name: party,
            }
        })
        .collect();

    Figure {
        data,
        layout: Layout {
            title: Title::new(title),
            xaxis: Axis {
                title: Title::new("Dim1"),
            },
            yaxis: Axis {
                title: Title::new("Dim2"),
            },
            hovermode: "closest",
            dragmode: "zoom",
            showlegend: true,
            legend: Legend {
                title: Title::new("Political Party"),
            },
        },
    }
}

/// Escape text for HTML element content and attributes
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Serialize a figure for inlining inside a `<script>` element
pub fn figure_to_script_json(figure: &Figure) -> serde_json::Result<String> {
    Ok(serde_json::to_string(figure)?.replace("</", "<\\/"))
}

/// Standalone HTML page showing a figure. Zoom, pan and legend toggles come
/// from plotly.js; clicking a point opens the member page when known.
pub fn render_html(figure: &Figure, title: &str, footer: &str) -> serde_json::Result<String> {
    let json = figure_to_script_json(figure)?;
    Ok(STATIC_PAGE
        .replace("__TITLE__", &escape_html(title))
        .replace("__FOOTER__", &escape_html(footer))
        .replace("__FIGURE__", &json))
}

const STATIC_PAGE: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="UTF-8">
<title>__TITLE__</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  body { font-family: sans-serif; margin: 1.5rem; }
  #plot { width: 100%; height: 85vh; }
  footer { color: #888; font-size: 0.8rem; }
</style>
</head>
<body>
<h1>__TITLE__</h1>
<div id="plot"></div>
<footer>__FOOTER__</footer>
<script>
  const figure = __FIGURE__;
  Plotly.newPlot("plot", figure.data, figure.layout, { responsive: true });
  document.getElementById("plot").on("plotly_click", (ev) => {
    const url = ev.points[0].customdata;
    if (url) window.open(url, "_blank");
  });
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReductionMethod;

    fn member(name: &str, party: &str, x: f64, y: f64) -> EmbeddedMember {
        EmbeddedMember {
            name: name.to_string(),
            party: party.to_string(),
            url: None,
            x,
            y,
        }
    }

    fn embedding() -> Embedding {
        Embedding {
            method: ReductionMethod::Pca,
            points: vec![
                member("김철수", "국민의힘", 1.0, 2.0),
                member("이영희", "더불어민주당", -1.0, 0.5),
                member("박민수", "미래당", 0.0, 0.0),
                member("김영수", "더불어민주당", -2.0, 1.0),
            ],
            explained_variance_ratio: None,
        }
    }

    #[test]
    fn test_traces_follow_palette_order() {
        let fig = build_figure(
            &embedding(),
            &PartyPalette::default(),
            &PlotOptions::default(),
            "t",
        );
        let names: Vec<&str> = fig.data.iter().map(|t| t.name.as_str()).collect();
        // Palette order first, unknown parties last
        assert_eq!(names, vec!["더불어민주당", "국민의힘", "미래당"]);
        assert_eq!(fig.data[0].x, vec![-1.0, -2.0]);
        assert_eq!(fig.data[2].marker.color, FALLBACK_COLORS[0]);
    }

    #[test]
    fn test_search_dims_non_matching() {
        let options = PlotOptions {
            search: Some(" 김 ".to_string()),
            show_labels: true,
        };
        let fig = build_figure(&embedding(), &PartyPalette::default(), &options, "t");
        assert_eq!(fig.data[0].marker.opacity, vec![DIMMED_OPACITY, 1.0]);
        assert_eq!(fig.data[1].marker.opacity, vec![1.0]);
        assert_eq!(fig.highlighted(), 2);
    }

    #[test]
    fn test_empty_search_highlights_all() {
        let options = PlotOptions {
            search: Some("   ".to_string()),
            show_labels: true,
        };
        let fig = build_figure(&embedding(), &PartyPalette::default(), &options, "t");
        assert_eq!(fig.highlighted(), 4);
    }

    #[test]
    fn test_label_toggle() {
        let hidden = PlotOptions {
            search: None,
            show_labels: false,
        };
        let fig = build_figure(&embedding(), &PartyPalette::default(), &hidden, "t");
        assert!(fig.data.iter().all(|t| t.mode == "markers" && t.text.is_none()));

        let shown = build_figure(
            &embedding(),
            &PartyPalette::default(),
            &PlotOptions::default(),
            "t",
        );
        assert_eq!(shown.data[1].text, Some(vec!["김철수".to_string()]));
        assert_eq!(shown.data[1].mode, "markers+text");
    }

    #[test]
    fn test_palette_overrides() {
        let palette = PartyPalette::with_overrides(&[
            PartyColor {
                party: "국민의힘".to_string(),
                color: "#ff0000".to_string(),
            },
            PartyColor {
                party: "미래당".to_string(),
                color: "#123456".to_string(),
            },
        ]);
        assert_eq!(palette.color_of("국민의힘"), Some("#ff0000"));
        assert_eq!(palette.color_of("미래당"), Some("#123456"));
        assert_eq!(palette.color_of("무소속"), Some("grey"));
    }

    #[test]
    fn test_matches_search() {
        assert!(matches_search("Kim Chul-soo", "kim"));
        assert!(matches_search("anyone", ""));
        assert!(!matches_search("Lee", "kim"));
    }

    #[test]
    fn test_render_html_escapes() {
        let fig = build_figure(
            &embedding(),
            &PartyPalette::default(),
            &PlotOptions::default(),
            "</script>",
        );
        let html = render_html(&fig, "A & B", "generated").unwrap();
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(!html.contains("\"</script>\""));
        assert!(html.contains("<\\/script>"));
    }

    #[test]
    fn test_figure_json_shape() {
        let fig = build_figure(
            &embedding(),
            &PartyPalette::default(),
            &PlotOptions::default(),
            "Votes",
        );
        let value = serde_json::to_value(&fig).unwrap();
        assert_eq!(value["data"][0]["type"], "scatter");
        assert_eq!(value["layout"]["legend"]["title"]["text"], "Political Party");
        assert_eq!(value["layout"]["hovermode"], "closest");
    }
}
