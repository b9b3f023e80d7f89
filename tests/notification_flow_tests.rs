#[cfg(test)]
mod notification_flow_tests {
    // Note: These are example tests showing what should be tested
    // Actual tests would require setting up a test database and mock services

    #[tokio::test]
    async fn test_multiple_related_entities_rejected() {
        // Test that creation fails before persistence when more than one
        // related-entity field is supplied

        // Given: a CreateNotificationRequest with related_video AND related_comment set
        // When: create_notification is called
        // Then: a VALIDATION_ERROR is returned and the notification table gains zero rows
    }

    #[tokio::test]
    async fn test_self_notification_is_silent_noop() {
        // Test self-notification suppression

        // Given: sender == recipient and type = comment_like
        // When: create_notification is called
        // Then: Ok(None) is returned and no row is written
        // And: the same call with type = system does create a row
    }

    #[tokio::test]
    async fn test_mark_read_skips_foreign_notifications() {
        // Test recipient-ownership on bulk mark-read

        // Given: notifications a, c owned by user-1 and b owned by user-2
        // When: mark_notifications_as_read([a, b, c], user-1) is called
        // Then: only a and c flip to is_read = true and affected == 2
        // And: b remains unread for user-2
    }

    #[tokio::test]
    async fn test_unread_count_lifecycle() {
        // Test the unread badge value

        // Given: user has 3 unread and 2 read notifications
        // When: get_unread_count is called
        // Then: it returns 3
        // When: mark_all_as_read is called and get_unread_count again
        // Then: it returns 0
    }

    #[tokio::test]
    async fn test_out_of_range_page_returns_empty_list() {
        // Test the pagination contract

        // Given: user has exactly 20 notifications
        // When: get_user_notifications(user, page = 2, limit = 20) is called
        // Then: data is empty, total_pages == 1 and has_next_page == false
    }

    #[tokio::test]
    async fn test_builder_drops_event_for_deleted_entity() {
        // Test dangling-reference handling in event builders

        // Given: a comment that has been deleted
        // When: notify_comment_like is called for it
        // Then: Ok(None) is returned, no error, no row written
    }

    #[tokio::test]
    async fn test_unread_count_defaults_to_zero_on_store_failure() {
        // Test the best-effort badge contract

        // Given: the record store is unreachable
        // When: get_unread_count is called
        // Then: it returns 0 instead of an error
    }
}

#[cfg(test)]
mod watch_progress_flow_tests {
    // Service-level scenarios over a live store; the pure merge logic is
    // covered by unit tests in src/models/watch_history.rs

    #[tokio::test]
    async fn test_completion_scenario_at_ninety_percent() {
        // Given: video duration = 600s
        // When: record_progress(u, v, 540) is called
        // Then: watch_percentage == 90.0, is_completed == true, completed_at set
        // When: record_progress(u, v, 300) follows
        // Then: watch_progress remains 540 and is_completed remains true
    }

    #[tokio::test]
    async fn test_single_record_per_user_video_pair() {
        // Given: repeated record_progress calls for the same (user, video)
        // Then: the watch_progress table holds exactly one row for the pair
        //       and watch_sessions equals the number of calls
    }

    #[tokio::test]
    async fn test_paused_history_drops_reports() {
        // Given: the user paused watch history
        // When: a progress report arrives
        // Then: no record is created or updated until resume
    }

    #[tokio::test]
    async fn test_playlist_add_is_idempotent() {
        // Given: a playlist that already contains video v
        // When: add_video(playlist, owner, v) is called again
        // Then: the playlist is returned unchanged with a single entry for v
    }
}
