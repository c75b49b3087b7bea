use newsstand_core::ViewMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub scale: f32,
}

/// Pages to display for the current view. Empty while the count is unknown;
/// double mode adds `page + 1` only when it exists.
pub fn plan_page_requests(
    page: u32,
    page_count: Option<u32>,
    view_mode: ViewMode,
    scale: f32,
) -> Vec<PageRequest> {
    let Some(count) = page_count else {
        return Vec::new();
    };
    if page == 0 || page > count {
        return Vec::new();
    }

    let mut requests = vec![PageRequest { page, scale }];
    if view_mode == ViewMode::Double && page < count {
        requests.push(PageRequest {
            page: page + 1,
            scale,
        });
    }
    requests
}
