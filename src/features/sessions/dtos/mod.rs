mod session_dto;

pub use session_dto::{
    ChatRequestDto, ChatResponseDto, DiagnoseRequestDto, MessageDto, SessionDetailDto, SessionDto,
};
