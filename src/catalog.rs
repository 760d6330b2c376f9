//! Catalog navigator: enrolled courses, course pages, lecture pages.
//!
//! The platform serves missing resources as HTTP 200 pages with a different
//! shape, so every existence check here is structural: the expected heading
//! element must be present and non-empty. Document order of lecture links,
//! attachments, and media ids is preserved exactly; destination filename
//! prefixes are derived from it.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Resource, Result};
use crate::fetch::Fetcher;

#[allow(clippy::expect_used)]
static COURSE_IDS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-course-ids]").expect("static selector"));

#[allow(clippy::expect_used)]
static COURSE_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".course-sidebar h2").expect("static selector"));

#[allow(clippy::expect_used)]
static LECTURE_ID: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-lecture-id]").expect("static selector"));

#[allow(clippy::expect_used)]
static LECTURE_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#lecture_heading").expect("static selector"));

#[allow(clippy::expect_used)]
static ATTACHMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".attachment > .download").expect("static selector"));

#[allow(clippy::expect_used)]
static MEDIA_ID: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-wistia-id]").expect("static selector"));

/// A course as derived from its enrolled-course page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    /// Sidebar course title (trimmed, never empty).
    pub title: String,
    /// Lecture page paths in document order.
    pub lecture_links: Vec<String>,
}

/// One downloadable attachment on a lecture page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureFile {
    /// Absolute download URL.
    pub url: String,
    /// Origin filename as advertised by the page.
    pub name: String,
}

/// A lecture as derived from its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lecture {
    /// Lecture heading (trimmed, never empty).
    pub title: String,
    /// Attachments in document order.
    pub files: Vec<LectureFile>,
    /// Embedded hosted-video identifiers in document order.
    pub media_ids: Vec<String>,
}

/// Read operations over the platform's authenticated HTML pages.
#[derive(Debug, Clone)]
pub struct Catalog {
    fetcher: Fetcher,
}

impl Catalog {
    /// Creates a catalog over the given fetcher.
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Lists the ids of all enrolled courses.
    ///
    /// The home page carries one marker element whose `data-course-ids`
    /// attribute encodes a platform-defined JSON payload, treated here as
    /// an opaque array of string-or-number identifiers. A missing marker
    /// element means no enrolled courses.
    ///
    /// # Errors
    ///
    /// [`Error::Request`] on fetch failure, [`Error::Parse`] for a
    /// malformed payload.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_course_ids(&self) -> Result<Vec<String>> {
        let document = self.fetcher.fetch("/").await?;
        parse_course_ids(&document)
    }

    /// Fetches one enrolled course page.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the sidebar title is absent or empty,
    /// [`Error::Request`] on fetch failure.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_course(&self, course_id: &str) -> Result<Course> {
        let document = self
            .fetcher
            .fetch(&format!("/courses/enrolled/{course_id}"))
            .await?;
        let course = parse_course(course_id, &document)?;
        debug!(title = %course.title, lectures = course.lecture_links.len(), "course parsed");
        Ok(course)
    }

    /// Fetches one lecture page by its link path.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the lecture heading is absent or empty,
    /// [`Error::Request`] on fetch failure.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_lecture(&self, link: &str) -> Result<Lecture> {
        let document = self.fetcher.fetch(link).await?;
        let lecture = parse_lecture(link, self.fetcher.base(), &document)?;
        debug!(
            title = %lecture.title,
            files = lecture.files.len(),
            media = lecture.media_ids.len(),
            "lecture parsed"
        );
        Ok(lecture)
    }
}

fn parse_course_ids(document: &Html) -> Result<Vec<String>> {
    let Some(payload) = document
        .select(&COURSE_IDS)
        .next()
        .and_then(|el| el.attr("data-course-ids"))
    else {
        return Ok(Vec::new());
    };
    let values: Vec<serde_json::Value> =
        serde_json::from_str(payload).map_err(|e| Error::parse("course id listing", e))?;
    Ok(values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        })
        .collect())
}

fn parse_course(course_id: &str, document: &Html) -> Result<Course> {
    let title = element_text(document, &COURSE_TITLE);
    if title.is_empty() {
        return Err(Error::not_found(Resource::Course, course_id));
    }

    let lecture_links = document
        .select(&LECTURE_ID)
        .filter_map(|el| el.attr("data-lecture-id"))
        .map(|lecture_id| format!("/courses/{course_id}/lectures/{lecture_id}"))
        .collect();

    Ok(Course {
        title,
        lecture_links,
    })
}

fn parse_lecture(link: &str, base: &Url, document: &Html) -> Result<Lecture> {
    let title = element_text(document, &LECTURE_TITLE);
    if title.is_empty() {
        return Err(Error::not_found(Resource::Lecture, link));
    }

    // Attachment hrefs are resolved to absolute URLs here so relative links
    // survive the handoff to the downloader.
    let files = document
        .select(&ATTACHMENT)
        .filter_map(|el| {
            let href = el.attr("href")?;
            let name = el.attr("data-x-origin-download-name")?;
            let url = base.join(href).ok()?;
            Some(LectureFile {
                url: url.to_string(),
                name: name.to_string(),
            })
        })
        .collect();

    let media_ids = document
        .select(&MEDIA_ID)
        .filter_map(|el| el.attr("data-wistia-id"))
        .map(str::to_string)
        .collect();

    Ok(Lecture {
        title,
        files,
        media_ids,
    })
}

fn element_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::Session;
    use crate::error::ErrorKind;

    use super::*;

    fn base() -> Url {
        Url::parse("https://platform.test").unwrap()
    }

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    const COURSE_PAGE: &str = r#"
        <div class="course-sidebar"><h2>  Intro to Espresso  </h2></div>
        <ul>
          <li data-lecture-id="11"></li>
          <li data-lecture-id="7"></li>
          <li data-lecture-id="42"></li>
        </ul>
    "#;

    const LECTURE_PAGE: &str = r#"
        <h1 id="lecture_heading"> Dialing In </h1>
        <div data-wistia-id="abc123"></div>
        <div class="attachment">
          <a class="download" href="/files/slides.pdf"
             data-x-origin-download-name="slides.pdf">slides</a>
        </div>
        <div class="attachment">
          <a class="download" href="https://cdn.test/worksheet.xlsx"
             data-x-origin-download-name="worksheet.xlsx">worksheet</a>
        </div>
        <div data-wistia-id="def456"></div>
    "#;

    #[test]
    fn test_parse_course_extracts_trimmed_title_and_ordered_links() {
        let course = parse_course("123456", &doc(COURSE_PAGE)).unwrap();
        assert_eq!(course.title, "Intro to Espresso");
        assert_eq!(
            course.lecture_links,
            vec![
                "/courses/123456/lectures/11",
                "/courses/123456/lectures/7",
                "/courses/123456/lectures/42",
            ]
        );
    }

    #[test]
    fn test_parse_course_missing_title_is_not_found() {
        let error = parse_course("123456", &doc("<div>layout shell</div>")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.to_string().contains("123456"));
    }

    #[test]
    fn test_parse_course_whitespace_title_is_not_found() {
        let html = r#"<div class="course-sidebar"><h2>   </h2></div>"#;
        let error = parse_course("123456", &doc(html)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_parse_lecture_preserves_document_order() {
        let lecture = parse_lecture("/l/1", &base(), &doc(LECTURE_PAGE)).unwrap();
        assert_eq!(lecture.title, "Dialing In");
        assert_eq!(
            lecture
                .files
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>(),
            vec!["slides.pdf", "worksheet.xlsx"]
        );
        assert_eq!(lecture.media_ids, vec!["abc123", "def456"]);
    }

    #[test]
    fn test_parse_lecture_resolves_relative_hrefs_against_base() {
        let lecture = parse_lecture("/l/1", &base(), &doc(LECTURE_PAGE)).unwrap();
        assert_eq!(lecture.files[0].url, "https://platform.test/files/slides.pdf");
        assert_eq!(lecture.files[1].url, "https://cdn.test/worksheet.xlsx");
    }

    #[test]
    fn test_parse_lecture_missing_heading_is_not_found() {
        let error = parse_lecture("/l/9", &base(), &doc("<div>shell</div>")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.to_string().contains("/l/9"));
    }

    #[test]
    fn test_parse_course_ids_decodes_json_payload() {
        let html = r#"<div data-course-ids="[123456, &quot;234567&quot;]"></div>"#;
        let ids = parse_course_ids(&doc(html)).unwrap();
        assert_eq!(ids, vec!["123456", "234567"]);
    }

    #[test]
    fn test_parse_course_ids_missing_marker_is_empty() {
        let ids = parse_course_ids(&doc("<body></body>")).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_parse_course_ids_malformed_payload_is_parse_error() {
        let html = r#"<div data-course-ids="not json"></div>"#;
        let error = parse_course_ids(&doc(html)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::RequestFailed);
    }

    #[tokio::test]
    async fn test_get_course_fetches_enrolled_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses/enrolled/123456"))
            .respond_with(ResponseTemplate::new(200).set_body_string(COURSE_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(
            Url::parse(&server.uri()).unwrap(),
            Session::new(String::new()),
        );
        let course = Catalog::new(fetcher).get_course("123456").await.unwrap();
        assert_eq!(course.title, "Intro to Espresso");
        assert_eq!(course.lecture_links.len(), 3);
    }

    #[tokio::test]
    async fn test_get_lecture_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses/123456/lectures/11"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LECTURE_PAGE))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(
            Url::parse(&server.uri()).unwrap(),
            Session::new(String::new()),
        );
        let lecture = Catalog::new(fetcher)
            .get_lecture("/courses/123456/lectures/11")
            .await
            .unwrap();
        assert_eq!(lecture.files.len(), 2);
        assert_eq!(lecture.media_ids.len(), 2);
    }
}
