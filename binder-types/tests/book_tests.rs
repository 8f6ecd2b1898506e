use binder_types::{Book, ChapterDraft, ChapterId, ChapterStatus, DraftSnapshot, Error};
use pretty_assertions::assert_eq;
use serde_json::json;

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_book_has_slugged_d_tag() {
    let book = Book::new("My First Novel!");
    assert!(book.d.starts_with("book-my-first-novel-"));
    assert_eq!(book.d.len(), "book-my-first-novel-".len() + 8);
    assert!(book.chapter_order.is_empty());
    assert_eq!(book.created_at, book.updated_at);
}

#[test]
fn new_chapter_numbers_its_slug() {
    let mut book = Book::new("Numbers");
    let first = ChapterDraft::new(&book, "One");
    assert!(first.d.starts_with("chapter-01-"));
    book.append_chapter(first.id);

    let second = ChapterDraft::new(&book, "Two");
    assert!(second.d.starts_with("chapter-02-"));
    assert_eq!(second.book_id, book.id);
    assert_eq!(second.status, ChapterStatus::Draft);
}

// ── Chapter order invariants ─────────────────────────────────────

#[test]
fn append_chapter_ignores_duplicates() {
    let mut book = Book::new("Dupes");
    let id = ChapterId::new();
    book.append_chapter(id);
    book.append_chapter(id);
    assert_eq!(book.chapter_order, vec![id]);
}

#[test]
fn append_chapter_bumps_updated_at() {
    let mut book = Book::new("Bump");
    let before = book.updated_at;
    book.append_chapter(ChapterId::new());
    assert!(book.updated_at > before);
}

#[test]
fn remove_chapter_reports_presence() {
    let mut book = Book::new("Remove");
    let id = ChapterId::new();
    book.append_chapter(id);
    assert!(book.remove_chapter(&id));
    assert!(!book.remove_chapter(&id));
    assert!(book.chapter_order.is_empty());
}

#[test]
fn reorder_rejects_duplicates() {
    let mut book = Book::new("Reorder");
    let a = ChapterId::new();
    let b = ChapterId::new();
    book.append_chapter(a);
    book.append_chapter(b);

    let err = book.reorder(vec![a, a]).unwrap_err();
    assert!(matches!(err, Error::DuplicateChapter(id) if id == a));
    assert_eq!(book.chapter_order, vec![a, b]);

    book.reorder(vec![b, a]).unwrap();
    assert_eq!(book.chapter_order, vec![b, a]);
}

#[test]
fn validate_chapter_order_detects_foreign_chapter() {
    let mut book = Book::new("Owner");
    let other = Book::new("Other");
    let mine = ChapterDraft::new(&book, "Mine");
    let theirs = ChapterDraft::new(&other, "Theirs");
    book.append_chapter(mine.id);
    book.append_chapter(theirs.id);

    let chapters = vec![mine.clone(), theirs.clone()];
    let err = book.validate_chapter_order(Some(&chapters)).unwrap_err();
    assert!(matches!(err, Error::ForeignChapter { chapter, .. } if chapter == theirs.id));

    book.remove_chapter(&theirs.id);
    book.validate_chapter_order(Some(&chapters)).unwrap();
    book.validate_chapter_order(None).unwrap();
}

// ── Wire format ──────────────────────────────────────────────────

#[test]
fn book_serializes_camel_case_and_omits_absent_options() {
    let mut book = Book::new("Wire");
    book.chapter_order.push(ChapterId::new());
    let value = serde_json::to_value(&book).unwrap();

    assert!(value.get("chapterOrder").is_some());
    assert!(value.get("updatedAt").is_some());
    assert!(value.get("coAuthors").is_some());
    assert!(value.get("summary").is_none());
    assert!(value.get("publishedHash").is_none());
}

#[test]
fn book_from_older_client_defaults_missing_lists() {
    let value = json!({
        "id": "3f2b8c1e-9a4d-4e6f-8b2a-1c3d5e7f9a0b",
        "d": "book-old-12345678",
        "title": "Old",
        "chapterOrder": [],
        "createdAt": 1,
        "updatedAt": 2
    });
    let book: Book = serde_json::from_value(value).unwrap();
    assert!(book.tags.is_empty());
    assert!(book.topics.is_empty());
    assert!(book.co_authors.is_empty());
    assert_eq!(book.updated_at.as_millis(), 2);
}

#[test]
fn chapter_status_is_lowercase() {
    let book = Book::new("Status");
    let mut chapter = ChapterDraft::new(&book, "Ch").with_content("# Hi");
    chapter.status = ChapterStatus::Ready;
    let value = serde_json::to_value(&chapter).unwrap();
    assert_eq!(value["status"], "ready");
    assert_eq!(value["contentMd"], "# Hi");
    assert_eq!(value["bookId"], book.id.to_string());
}

#[test]
fn draft_snapshot_captures_content() {
    let chapter_id = ChapterId::new();
    let snap = DraftSnapshot::new(chapter_id, "text", "autosave");
    assert_eq!(snap.chapter_id, chapter_id);
    assert_eq!(snap.content_md, "text");
    assert_eq!(snap.reason, "autosave");

    let value = serde_json::to_value(&snap).unwrap();
    assert_eq!(value["chapterId"], chapter_id.to_string());
}

// ── Properties ───────────────────────────────────────────────────

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn chapter_order_stays_unique(
            ops in proptest::collection::vec((0usize..6, any::<bool>()), 0..40)
        ) {
            let ids: Vec<ChapterId> = (0..6).map(|_| ChapterId::new()).collect();
            let mut book = Book::new("Property");
            let mut last = book.updated_at;
            for (index, append) in ops {
                if append {
                    book.append_chapter(ids[index]);
                } else {
                    book.remove_chapter(&ids[index]);
                }
                prop_assert!(book.updated_at >= last);
                last = book.updated_at;
            }
            prop_assert!(book.validate_chapter_order(None).is_ok());
        }

        #[test]
        fn d_tag_is_url_safe(title in "\\PC{0,80}") {
            let book = Book::new(title);
            prop_assert!(book.d.starts_with("book-"));
            prop_assert!(
                book.d
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            );
        }
    }
}
