pub mod comment;
pub mod like_comment;
pub mod like_post;
pub mod post;
pub mod user;

pub use comment::{Comment, CommentSummary, CommentWithUser, NewComment};
pub use like_comment::{
    LikeComment, LikeCommentFilters, LikeCommentWithComment, LikeCommentWithDetails,
    LikeCommentWithUser, NewLikeComment,
};
pub use like_post::{LikePost, NewLikePost};
pub use post::{NewPost, Post, PostFilters, PostPatch, PostWithUser};
pub use user::{NewUser, User, UserFilters, UserPatch, UserSummary};
