// frontend/src/notification_bell/dispatch.rs
//
// Row click -> admin panel action, chosen by the notification type tag.
// The actions themselves live elsewhere in the panel and are handed in as
// `AdminHooks`; any hook may be missing, in which case the click degrades to an
// info dialog.

use super::dialog::{DialogPresenter, InfoDialog};
use super::render::NotificationRow;
use adminbell_shared::NotificationKind;
use std::rc::Rc;
use tracing::warn;

pub const DETAILS_TITLE: &str = "Notification details";

/// Arguments of the review reply action. `notification_id` names the row that
/// was clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReply {
    pub notification_id: String,
    pub location_id: String,
    pub review_id: String,
    pub user_id: String,
}

type IdHook = Rc<dyn Fn(&str)>;

/// The four admin panel actions a notification can lead to.
#[derive(Clone, Default)]
pub struct AdminHooks {
    pub view_booking_details: Option<IdHook>,
    pub open_direct_message: Option<IdHook>,
    pub handle_review_reply: Option<Rc<dyn Fn(&ReviewReply)>>,
    pub render_reviews: Option<Rc<dyn Fn()>>,
}

impl AdminHooks {
    pub fn with_view_booking_details(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.view_booking_details = Some(Rc::new(f));
        self
    }

    pub fn with_open_direct_message(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.open_direct_message = Some(Rc::new(f));
        self
    }

    pub fn with_handle_review_reply(mut self, f: impl Fn(&ReviewReply) + 'static) -> Self {
        self.handle_review_reply = Some(Rc::new(f));
        self
    }

    pub fn with_render_reviews(mut self, f: impl Fn() + 'static) -> Self {
        self.render_reviews = Some(Rc::new(f));
        self
    }

    /// Stand-ins for a panel that has not wired the real actions yet.
    pub fn placeholders(dialogs: Rc<dyn DialogPresenter>) -> Self {
        let d1 = dialogs.clone();
        let d2 = dialogs.clone();
        let d3 = dialogs.clone();
        let d4 = dialogs;

        AdminHooks::default()
            .with_view_booking_details(move |booking_id| {
                warn!("viewBookingDetails (placeholder) called");
                d1.show(InfoDialog::info("Booking details", format!("Booking ID: {booking_id}")));
            })
            .with_open_direct_message(move |user_id| {
                warn!("openDirectMessageModal (placeholder) called");
                d2.show(InfoDialog::info("Direct message", format!("User ID: {user_id}")));
            })
            .with_handle_review_reply(move |r| {
                warn!("handleReviewReply (placeholder) called");
                d3.show(InfoDialog::info(
                    "Review",
                    format!("Review ID: {}, User ID: {}", r.review_id, r.user_id),
                ));
            })
            .with_render_reviews(move || {
                warn!("renderReviews (placeholder) called");
                d4.show(InfoDialog::info("Review list", "Reloading the review list."));
            })
    }

    /// Fills every missing hook with its placeholder.
    pub fn or_placeholders(self, dialogs: Rc<dyn DialogPresenter>) -> Self {
        let stub = AdminHooks::placeholders(dialogs);
        AdminHooks {
            view_booking_details: self.view_booking_details.or(stub.view_booking_details),
            open_direct_message: self.open_direct_message.or(stub.open_direct_message),
            handle_review_reply: self.handle_review_reply.or(stub.handle_review_reply),
            render_reviews: self.render_reviews.or(stub.render_reviews),
        }
    }
}

/// What a click ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    BookingDetails(String),
    DirectMessage(String),
    ReviewReply(ReviewReply),
    ReviewList(InfoDialog),
    Dialog(InfoDialog),
}

pub fn dispatch_click(
    row: &NotificationRow,
    hooks: &AdminHooks,
    dialogs: &dyn DialogPresenter,
) -> Dispatch {
    let fallback = |text: String| {
        let d = InfoDialog::info(DETAILS_TITLE, text);
        dialogs.show(d.clone());
        Dispatch::Dialog(d)
    };

    match row.kind {
        k if k.is_booking() => match &hooks.view_booking_details {
            Some(view) if !row.booking_id.is_empty() => {
                view(&row.booking_id);
                Dispatch::BookingDetails(row.booking_id.clone())
            }
            _ => {
                warn!("viewBookingDetails not available or bookingId missing");
                fallback(format!(
                    "Booking information ({k}): booking ID {}",
                    row.booking_id
                ))
            }
        },

        NotificationKind::Chat => match &hooks.open_direct_message {
            Some(open) if !row.user_id.is_empty() => {
                open(&row.user_id);
                Dispatch::DirectMessage(row.user_id.clone())
            }
            _ => {
                warn!("openDirectMessageModal not available or userId missing");
                fallback(format!("New message from user: {}", row.user_id))
            }
        },

        k if k.is_review() => {
            let complete = !row.location_id.is_empty()
                && !row.review_id.is_empty()
                && !row.user_id.is_empty();

            match (&hooks.handle_review_reply, &hooks.render_reviews) {
                (Some(reply), _) if complete => {
                    let args = ReviewReply {
                        notification_id: row.id.clone(),
                        location_id: row.location_id.clone(),
                        review_id: row.review_id.clone(),
                        user_id: row.user_id.clone(),
                    };
                    reply(&args);
                    Dispatch::ReviewReply(args)
                }
                (_, Some(render)) => {
                    warn!("handleReviewReply not available or review ids incomplete, reloading reviews");
                    render();
                    let d = InfoDialog::info(DETAILS_TITLE, format!("New review: {}", row.review_id));
                    dialogs.show(d.clone());
                    Dispatch::ReviewList(d)
                }
                _ => {
                    warn!("no review handler available");
                    fallback(format!("New review for location: {}", row.location_id))
                }
            }
        }

        _ => fallback(format!("General notification: {}", row.title)),
    }
}
