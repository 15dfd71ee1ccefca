//! Course catalogue: courses, modules, lessons

use aula_common::db::{Course, Lesson, Module};
use aula_common::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};

use super::new_id;

/// Course with catalogue counters
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CourseSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub module_count: i64,
    pub lesson_count: i64,
    pub enrollment_count: i64,
}

/// Catalogue filters; blank values are ignored
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl CourseFilter {
    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)))
    }
}

const PUBLISHED_FILTER: &str = r#"
    c.is_published = 1
    AND (? IS NULL OR c.category = ?)
    AND (? IS NULL OR c.title LIKE ? ESCAPE '\' OR c.description LIKE ? ESCAPE '\')
"#;

/// Literal match for `LIKE ... ESCAPE '\'`
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub async fn count_published<'e, E>(executor: E, filter: &CourseFilter) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT COUNT(*) FROM courses c WHERE {}", PUBLISHED_FILTER);
    let pattern = filter.search_pattern();

    let count: i64 = sqlx::query_scalar(&sql)
        .bind(filter.category())
        .bind(filter.category())
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

/// One page of published courses, newest first
pub async fn list_published<'e, E>(
    executor: E,
    filter: &CourseFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<CourseSummary>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        SELECT c.*,
            (SELECT COUNT(*) FROM modules m WHERE m.course_id = c.id) AS module_count,
            (SELECT COUNT(*) FROM lessons l JOIN modules m ON m.id = l.module_id
                WHERE m.course_id = c.id) AS lesson_count,
            (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id) AS enrollment_count
        FROM courses c
        WHERE {}
        ORDER BY c.created_at DESC, c.title
        LIMIT ? OFFSET ?
        "#,
        PUBLISHED_FILTER
    );
    let pattern = filter.search_pattern();

    let courses = sqlx::query_as::<_, CourseSummary>(&sql)
        .bind(filter.category())
        .bind(filter.category())
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

    Ok(courses)
}

/// Course by id regardless of publication state
pub async fn find_course<'e, E>(executor: E, id: &str) -> Result<Option<Course>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(course)
}

pub async fn list_modules<'e, E>(executor: E, course_id: &str) -> Result<Vec<Module>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let modules = sqlx::query_as::<_, Module>(
        "SELECT * FROM modules WHERE course_id = ? ORDER BY position, title",
    )
    .bind(course_id)
    .fetch_all(executor)
    .await?;

    Ok(modules)
}

/// Every lesson of a course in module order, then lesson order
pub async fn list_course_lessons<'e, E>(executor: E, course_id: &str) -> Result<Vec<Lesson>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let lessons = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT l.*
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE m.course_id = ?
        ORDER BY m.position, l.position, l.title
        "#,
    )
    .bind(course_id)
    .fetch_all(executor)
    .await?;

    Ok(lessons)
}

pub async fn count_course_lessons<'e, E>(executor: E, course_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE m.course_id = ?
        "#,
    )
    .bind(course_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Course id owning a lesson
pub async fn find_lesson_course_id<'e, E>(executor: E, lesson_id: &str) -> Result<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let course_id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT m.course_id
        FROM lessons l
        JOIN modules m ON m.id = l.module_id
        WHERE l.id = ?
        "#,
    )
    .bind(lesson_id)
    .fetch_optional(executor)
    .await?;

    Ok(course_id)
}

pub async fn find_module<'e, E>(executor: E, id: &str) -> Result<Option<Module>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let module = sqlx::query_as::<_, Module>("SELECT * FROM modules WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(module)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

pub async fn insert_course<'e, E>(
    executor: E,
    instructor_id: &str,
    new: &NewCourse,
) -> Result<Course>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (
            id, title, description, category, level, thumbnail_url, instructor_id,
            is_published, created_at, updated_at
        )
        VALUES (?, ?, ?, COALESCE(?, 'general'), COALESCE(?, 'beginner'), ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(new.title.trim())
    .bind(&new.description)
    .bind(&new.category)
    .bind(&new.level)
    .bind(&new.thumbnail_url)
    .bind(instructor_id)
    .bind(new.is_published)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(course)
}

/// Partial course edit; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_published: Option<bool>,
}

pub async fn update_course<'e, E>(
    executor: E,
    id: &str,
    update: &CourseUpdate,
) -> Result<Option<Course>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let course = sqlx::query_as::<_, Course>(
        r#"
        UPDATE courses SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            level = COALESCE(?, level),
            thumbnail_url = COALESCE(?, thumbnail_url),
            is_published = COALESCE(?, is_published),
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(update.title.as_deref().map(str::trim))
    .bind(&update.description)
    .bind(&update.category)
    .bind(&update.level)
    .bind(&update.thumbnail_url)
    .bind(update.is_published)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(course)
}

/// Append a module at the end of the course
pub async fn insert_module<'e, E>(executor: E, course_id: &str, title: &str) -> Result<Module>
where
    E: Executor<'e, Database = Sqlite>,
{
    let module = sqlx::query_as::<_, Module>(
        r#"
        INSERT INTO modules (id, course_id, title, position)
        VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM modules WHERE course_id = ?))
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(course_id)
    .bind(title.trim())
    .bind(course_id)
    .fetch_one(executor)
    .await?;

    Ok(module)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLesson {
    pub title: String,
    pub content: Option<String>,
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: i64,
}

/// Append a lesson at the end of the module
pub async fn insert_lesson<'e, E>(executor: E, module_id: &str, new: &NewLesson) -> Result<Lesson>
where
    E: Executor<'e, Database = Sqlite>,
{
    let lesson = sqlx::query_as::<_, Lesson>(
        r#"
        INSERT INTO lessons (id, module_id, title, content, video_url, duration_minutes, position)
        VALUES (?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM lessons WHERE module_id = ?))
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(module_id)
    .bind(new.title.trim())
    .bind(&new.content)
    .bind(&new.video_url)
    .bind(new.duration_minutes.max(0))
    .bind(module_id)
    .fetch_one(executor)
    .await?;

    Ok(lesson)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aula_common::db::init_memory_database;

    fn course(title: &str, category: &str, published: bool) -> NewCourse {
        NewCourse {
            title: title.to_string(),
            description: Some(format!("About {}", title)),
            category: Some(category.to_string()),
            level: None,
            thumbnail_url: None,
            is_published: published,
        }
    }

    async fn seed_instructor(pool: &sqlx::SqlitePool) -> String {
        let mut conn = pool.acquire().await.unwrap();
        crate::db::users::create_user(
            &mut conn,
            &crate::db::users::NewUser {
                email: "instructor@example.com",
                name: "Instructor",
                image: None,
                password_hash: None,
                role: aula_common::db::Role::Instructor,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_catalogue_lists_only_published() {
        let pool = init_memory_database().await.unwrap();
        let instructor = seed_instructor(&pool).await;

        insert_course(&pool, &instructor, &course("Algebra", "math", true)).await.unwrap();
        insert_course(&pool, &instructor, &course("Draft", "math", false)).await.unwrap();
        insert_course(&pool, &instructor, &course("Poetry", "arts", true)).await.unwrap();

        let all = CourseFilter::default();
        assert_eq!(count_published(&pool, &all).await.unwrap(), 2);

        let math = CourseFilter {
            category: Some("math".to_string()),
            search: None,
        };
        let listed = list_published(&pool, &math, 20, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].course.title, "Algebra");
        assert_eq!(listed[0].lesson_count, 0);

        let search = CourseFilter {
            category: Some("  ".to_string()),
            search: Some("poe".to_string()),
        };
        assert_eq!(count_published(&pool, &search).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let pool = init_memory_database().await.unwrap();
        let instructor = seed_instructor(&pool).await;

        insert_course(&pool, &instructor, &course("100% Italian", "languages", true)).await.unwrap();
        insert_course(&pool, &instructor, &course("Cooking", "food", true)).await.unwrap();
        insert_course(&pool, &instructor, &course("snake_case style", "code", true)).await.unwrap();

        let search = |text: &str| CourseFilter {
            category: None,
            search: Some(text.to_string()),
        };
        let percent = list_published(&pool, &search("%"), 20, 0).await.unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].course.title, "100% Italian");

        let underscore = list_published(&pool, &search("_"), 20, 0).await.unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].course.title, "snake_case style");

        assert_eq!(escape_like(r"a\b%c_d"), r"a\\b\%c\_d");
    }

    #[tokio::test]
    async fn test_positions_append() {
        let pool = init_memory_database().await.unwrap();
        let instructor = seed_instructor(&pool).await;
        let c = insert_course(&pool, &instructor, &course("Algebra", "math", true))
            .await
            .unwrap();
        assert_eq!(c.category, "math");
        assert_eq!(c.level, "beginner");

        let m1 = insert_module(&pool, &c.id, "Basics").await.unwrap();
        let m2 = insert_module(&pool, &c.id, "Advanced").await.unwrap();
        assert_eq!((m1.position, m2.position), (1, 2));

        let lesson = NewLesson {
            title: "Intro".to_string(),
            content: None,
            video_url: None,
            duration_minutes: 5,
        };
        let l1 = insert_lesson(&pool, &m2.id, &lesson).await.unwrap();
        let l2 = insert_lesson(&pool, &m1.id, &lesson).await.unwrap();
        assert_eq!((l1.position, l2.position), (1, 1));

        let ordered = list_course_lessons(&pool, &c.id).await.unwrap();
        assert_eq!(ordered[0].id, l2.id);
        assert_eq!(count_course_lessons(&pool, &c.id).await.unwrap(), 2);
        assert_eq!(
            find_lesson_course_id(&pool, &l1.id).await.unwrap(),
            Some(c.id.clone())
        );
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let pool = init_memory_database().await.unwrap();
        let instructor = seed_instructor(&pool).await;
        let c = insert_course(&pool, &instructor, &course("Algebra", "math", false))
            .await
            .unwrap();

        let updated = update_course(
            &pool,
            &c.id,
            &CourseUpdate {
                is_published: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert!(updated.is_published);
        assert_eq!(updated.title, "Algebra");
        assert!(update_course(&pool, "missing", &CourseUpdate::default())
            .await
            .unwrap()
            .is_none());
    }
}
