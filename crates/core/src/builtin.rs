use crate::{Category, CategoryRecord, DocumentRecord};

pub(crate) fn categories() -> Vec<CategoryRecord> {
    vec![
        category(
            Category::Science,
            "Science Magazines",
            "Explore the latest in science and technology",
            "https://images.unsplash.com/photo-1507413245164-6160d8298b31?w=800&auto=format&fit=crop",
        ),
        category(
            Category::Kannada,
            "ಕನ್ನಡ ಪತ್ರಿಕೆಗಳು",
            "Kannada language magazines and publications",
            "https://images.unsplash.com/photo-1544716278-ca5e3f4abd8c?w=800&auto=format&fit=crop",
        ),
        category(
            Category::Newsletter,
            "Newsletters",
            "Monthly newsletters and updates",
            "https://images.unsplash.com/photo-1457369804613-52c61a468e7d?w=800&auto=format&fit=crop",
        ),
    ]
}

pub(crate) fn documents() -> Vec<DocumentRecord> {
    vec![
        document("June 2023", "June 2023", "June 2023", Category::Science, "Science/s1"),
        document("May 2023", "May 2023", "May 2023", Category::Science, "Science/s2"),
        document("April 2023", "April 2023", "April 2023", Category::Science, "Science/s3"),
        document("kannada-2024-02", "June 2023", "June 2023", Category::Kannada, "Kannada/k1"),
        document("kannada-2024-03", "July 2023", "July 2023", Category::Kannada, "Kannada/k2"),
        document(
            "newsletter-2024-02",
            "June Newsletter",
            "June 2023",
            Category::Newsletter,
            "Newsletter/n1",
        ),
        document(
            "newsletter-2024-01",
            "May Newsletter",
            "May 2023",
            Category::Newsletter,
            "Newsletter/n2",
        ),
        document(
            "newsletter-2024-03",
            "April Newsletter",
            "April 2023",
            Category::Newsletter,
            "Newsletter/n3",
        ),
    ]
}

fn category(id: Category, name: &str, description: &str, icon_ref: &str) -> CategoryRecord {
    CategoryRecord {
        id,
        name: name.to_string(),
        description: description.to_string(),
        icon_ref: icon_ref.to_string(),
    }
}

fn document(id: &str, title: &str, date: &str, category: Category, stem: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        category,
        cover_image_ref: format!("/magazines/{stem}.png"),
        source_locator: format!("/magazines/{stem}.pdf"),
        total_pages: None,
    }
}
