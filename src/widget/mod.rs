mod favorite_widget;

pub use favorite_widget::{FavoriteWidget, WidgetState};
